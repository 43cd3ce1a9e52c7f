//! One module per top-level subcommand family, mirroring the `Commands`
//! enum in [`crate::cli`].

mod build;
mod doc;
mod grep;
mod lsp;
mod pipeline;
mod sdk;
mod secret;
mod settings;
mod template;
mod ctags;

use anyhow::Result;

use crate::cli::{Cli, Commands};

fn project_directory(cli: &Cli) -> std::path::PathBuf {
    cli.project_directory
        .clone()
        .unwrap_or_else(|| std::env::current_dir().expect("current directory"))
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    let format = cli.format;
    let project_dir = project_directory(&cli);

    match cli.command {
        Commands::Build { phase } => build::run(&project_dir, &phase).await,
        Commands::Pipeline { command } => pipeline::run(&project_dir, command).await,
        Commands::Sdk { command } => sdk::run(format, command).await,
        Commands::Doc { command } => doc::run(format, command).await,
        Commands::Grep {
            pattern,
            targets,
            recursive,
            ignore_case,
            extended_regexp,
            word_regexp,
            max_count,
            context_lines,
        } => {
            grep::run(grep::GrepArgs {
                pattern,
                targets,
                recursive,
                ignore_case,
                extended_regexp,
                word_regexp,
                max_count,
                context_lines,
            })
            .await
        }
        Commands::Settings { command } => settings::run(&project_dir, format, command).await,
        Commands::Secret { command } => secret::run(&project_dir, command).await,
        Commands::Template { command } => template::run(command).await,
        Commands::Lsp { language } => lsp::run(&language).await,
        Commands::Ctags { file } => ctags::run(&file).await,
    }
}
