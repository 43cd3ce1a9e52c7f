//! The `foundry` command tree.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::Format;

#[derive(Parser, Debug)]
#[command(name = "foundry", version, about = "Foundry developer-tooling CLI")]
pub struct Cli {
    /// Output format for list-producing subcommands.
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Project directory; defaults to the current directory, searching
    /// ancestors for a `.foundry` marker the way `Context::discover` does.
    #[arg(long, global = true)]
    pub project_directory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the build pipeline up to a given phase.
    Build {
        #[arg(long, default_value = "build")]
        phase: String,
    },
    /// Manage pipeline phase links between projects.
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Manage SDKs.
    Sdk {
        #[command(subcommand)]
        command: SdkCommands,
    },
    /// Query documentation bundles.
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },
    /// Search project files for a pattern.
    Grep {
        pattern: String,
        targets: Vec<PathBuf>,
        #[arg(short = 'r', long)]
        recursive: bool,
        #[arg(short = 'i', long)]
        ignore_case: bool,
        #[arg(short = 'E', long)]
        extended_regexp: bool,
        #[arg(short = 'w', long)]
        word_regexp: bool,
        #[arg(short = 'm', long = "max-count")]
        max_count: Option<usize>,
        #[arg(short = 'C', long = "context")]
        context_lines: Option<usize>,
    },
    /// Read and write `app.devsuite.foundry.*` settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Manage stored API keys.
    Secret {
        #[command(subcommand)]
        command: SecretCommands,
    },
    /// Instantiate a project template.
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Run a language server.
    Lsp { language: String },
    /// Generate a ctags index for a file.
    Ctags { file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum PipelineCommands {
    Link {
        phase: String,
        project_directory: PathBuf,
        linked_phase: String,
    },
    Unlink {
        phase: String,
        project_directory: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum SdkCommands {
    Switch { sdk_id: String },
    Which { sdk: String, program: String },
    List,
}

#[derive(Subcommand, Debug)]
pub enum DocCommands {
    Query { search_text: Vec<String> },
    BundleList,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    Get { schema: String, key: String },
}

#[derive(Subcommand, Debug)]
pub enum SecretCommands {
    SetApiKey {
        host: String,
        service: String,
        key: String,
    },
    GetApiKey {
        host: String,
        service: String,
    },
    Rotate {
        host: String,
        service: String,
        key: String,
        #[arg(long = "expire-at")]
        expire_at: Option<String>,
    },
    CheckExpiresAt {
        host: String,
        service: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    Create { template_id: String },
}
