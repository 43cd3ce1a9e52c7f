//! `foundry ctags FILE`: shells out to a system `ctags` binary to generate
//! a tags index for a single file, printing the result to stdout.
//!
//! No tags-generation logic lives in this crate; ctags itself already does
//! this well, and reimplementing a C/Rust/Python parser here would
//! duplicate it for no benefit.

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use tokio::process::Command;

pub async fn run(file: &Path) -> Result<()> {
    let ctags = which::which("ctags").context("`ctags` binary not found on PATH")?;

    let output = Command::new(ctags)
        .arg("-f")
        .arg("-")
        .arg(file)
        .output()
        .await
        .context("failed to run ctags")?;

    if !output.status.success() {
        bail!("ctags exited with {}", output.status);
    }

    print!("{}", String::from_utf8_lossy(&output.stdout));
    Ok(())
}
