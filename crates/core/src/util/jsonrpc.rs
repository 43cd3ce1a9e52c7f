//! `Content-Length`-framed JSON-RPC message I/O, shared by `foundry lsp run`
//! and anything else in this crate that speaks LSP-style framing.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::{FoundryError, Result};

/// Refuse to allocate a buffer for a frame larger than this many bytes —
/// a malformed or hostile peer declaring a multi-gigabyte `Content-Length`
/// shouldn't be able to make us try to allocate it.
const MAX_FRAME_LEN: usize = 1 << 30;

/// Read one `Content-Length: N\r\n\r\n<N bytes>` frame from `reader`,
/// returning the raw payload bytes (typically further parsed as JSON by the
/// caller).
pub async fn read_frame<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut content_length: Option<usize> = None;
    loop {
        let mut header = String::new();
        let n = reader.read_line(&mut header).await?;
        if n == 0 {
            return Err(FoundryError::invalid_data("unexpected eof reading frame header"));
        }
        let trimmed = header.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        if let Some(value) = trimmed.strip_prefix("Content-Length:") {
            let parsed: usize = value
                .trim()
                .parse()
                .map_err(|_| FoundryError::invalid_data("invalid Content-Length header"))?;
            if parsed > MAX_FRAME_LEN {
                return Err(FoundryError::invalid_data("Content-Length exceeds 1 GiB limit"));
            }
            content_length = Some(parsed);
        }
    }

    let len = content_length
        .ok_or_else(|| FoundryError::invalid_data("frame missing Content-Length header"))?;
    let mut body = vec![0u8; len];
    tokio::io::AsyncReadExt::read_exact(reader, &mut body).await?;
    Ok(body)
}

/// Write `payload` as one `Content-Length`-framed message.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}
