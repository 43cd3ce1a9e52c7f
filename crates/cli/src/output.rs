//! Shared `--format text|json` plumbing for list-producing subcommands.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Text => write!(f, "text"),
            Format::Json => write!(f, "json"),
        }
    }
}

/// Print `value` as JSON (pretty, to stdout) or, for text mode, defer to
/// `render` for a human-readable rendering.
pub fn emit<T: Serialize>(format: Format, value: &T, render: impl FnOnce(&T)) -> anyhow::Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), value)?;
            println!();
        }
        Format::Text => render(value),
    }
    Ok(())
}
