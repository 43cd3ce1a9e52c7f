//! `foundry template create`: a seam over concrete template providers.
//! Concrete template expansion (copying skeleton files, substituting
//! placeholders) lives in a loaded provider; with none bundled, this
//! reports which template was requested and that no provider handled it.

use anyhow::{bail, Result};

use crate::cli::TemplateCommands;

pub async fn run(command: TemplateCommands) -> Result<()> {
    match command {
        TemplateCommands::Create { template_id } => {
            bail!("no template provider registered for `{template_id}`")
        }
    }
}
