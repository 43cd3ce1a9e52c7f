//! `foundry lsp run`: a seam over concrete language server backends.
//! Without a registered backend for `language`, reports `NotSupported`
//! rather than guessing at a binary to exec.

use anyhow::{bail, Result};

pub async fn run(language: &str) -> Result<()> {
    bail!("no language server registered for `{language}`")
}
