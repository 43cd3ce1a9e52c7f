use std::path::Path;

use anyhow::Result;
use foundry_core::settings::{LinkedWorkspace, Settings};

use crate::cli::PipelineCommands;

fn settings_for(project_directory: &Path) -> Result<Settings> {
    Settings::open(project_directory.join(".foundry").join("settings.json")).map_err(Into::into)
}

pub async fn run(project_directory: &Path, command: PipelineCommands) -> Result<()> {
    let settings = settings_for(project_directory)?;

    match command {
        PipelineCommands::Link {
            phase,
            project_directory: linked_dir,
            linked_phase,
        } => {
            let mut links = settings.linked_workspaces();
            links.push(LinkedWorkspace {
                phase,
                project_directory: linked_dir,
                linked_phase,
            });
            settings.set_linked_workspaces(&links)?;
            println!("linked.");
        }
        PipelineCommands::Unlink {
            phase,
            project_directory: linked_dir,
        } => {
            let mut links = settings.linked_workspaces();
            links.retain(|l| !(l.phase == phase && l.project_directory == linked_dir));
            settings.set_linked_workspaces(&links)?;
            println!("unlinked.");
        }
    }

    Ok(())
}
