use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.format == output::Format::Json {
        foundry_core::logging::init_json();
    } else {
        foundry_core::logging::init();
    }

    if let Err(err) = commands::dispatch(cli).await {
        eprintln!("{err:#}");
        std::process::exit(1);
    }

    Ok(())
}
