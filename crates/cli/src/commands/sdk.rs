//! `foundry sdk`: a seam over whatever concrete SDK providers a deployment
//! loads. With no concrete provider bundled in this crate, `switch` reports
//! `NotSupported` and `which`/`list` fall back to resolving plain `$PATH`
//! entries, matching the original's documented "no providers configured"
//! behavior.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::cli::SdkCommands;
use crate::output::{self, Format};

#[derive(Serialize)]
struct SdkListEntry {
    name: String,
    path: String,
}

pub async fn run(format: Format, command: SdkCommands) -> Result<()> {
    match command {
        SdkCommands::Switch { sdk_id } => {
            bail!("no SDK provider registered to switch to `{sdk_id}`")
        }
        SdkCommands::Which { sdk: _, program } => match which::which(&program) {
            Ok(path) => {
                println!("{}", path.display());
                Ok(())
            }
            Err(_) => bail!("`{program}` not found on PATH"),
        },
        SdkCommands::List => {
            let entries: Vec<SdkListEntry> = std::env::var_os("PATH")
                .map(|paths| {
                    std::env::split_paths(&paths)
                        .map(|p| SdkListEntry {
                            name: p
                                .file_name()
                                .map(|n| n.to_string_lossy().into_owned())
                                .unwrap_or_default(),
                            path: p.display().to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default();

            output::emit(format, &entries, |entries| {
                for entry in entries {
                    println!("{}\t{}", entry.name, entry.path);
                }
            })
        }
    }
}
