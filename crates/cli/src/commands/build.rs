use std::path::Path;

use anyhow::{anyhow, Result};
use foundry_core::build::{BuildPipeline, Phase, ORDERED_PHASES};
use foundry_core::scheduler::Cancellable;

fn parse_phase(name: &str) -> Result<Phase> {
    match name {
        "dependencies" => Ok(Phase::DEPENDENCIES),
        "downloads" => Ok(Phase::DOWNLOADS),
        "autogen" => Ok(Phase::AUTOGEN),
        "configure" => Ok(Phase::CONFIGURE),
        "build" => Ok(Phase::BUILD),
        "install" => Ok(Phase::INSTALL),
        "commit" => Ok(Phase::COMMIT),
        "export" => Ok(Phase::EXPORT),
        other => Err(anyhow!("unknown build phase `{other}`")),
    }
}

/// OR together every phase up to and including `target`, the mask a `foundry
/// build <phase>` invocation actually wants: "build through configure" means
/// running dependencies, downloads, autogen and configure too, not just the
/// configure stage in isolation. `BuildPipeline` itself takes the mask as-is
/// and has no notion of "up to"; that expansion is this CLI's job alone.
fn cumulative_mask(target: Phase) -> Phase {
    let mut mask = Phase::NONE;
    for phase in ORDERED_PHASES {
        mask |= phase;
        if phase == target {
            break;
        }
    }
    mask
}

pub async fn run(_project_directory: &Path, phase: &str) -> Result<()> {
    let target = parse_phase(phase)?;
    let mask = cumulative_mask(target);
    let pipeline = BuildPipeline::new();
    let progress = pipeline.run(mask, Cancellable::new()).await?;
    println!(
        "build finished: target phase {:?}, stage {}",
        progress.target_phase(),
        progress.current_stage().unwrap_or_else(|| "<none>".into())
    );
    Ok(())
}
