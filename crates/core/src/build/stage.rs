//! The `BuildStage` trait: one unit of work run by a `BuildPipeline`.

use async_trait::async_trait;

use crate::build::phase::Phase;
use crate::errors::Result;
use crate::scheduler::Cancellable;

/// One step of a build, bound to a single [`Phase`].
///
/// Stages execute in phase order; stages within the same phase execute in
/// the order they were attached to the pipeline. A stage that returns an
/// error aborts the remaining pipeline run.
#[async_trait]
pub trait BuildStage: Send + Sync {
    fn id(&self) -> &str;

    fn phase(&self) -> Phase;

    /// Cheap precheck run before `build`. Returning `Ok(true)` marks the
    /// stage already completed for this run, skipping `build` entirely. A
    /// failing `query` is non-fatal: the pipeline logs it and proceeds as
    /// though it had returned `Ok(false)`.
    async fn query(&self, _cancellable: Cancellable) -> Result<bool> {
        Ok(false)
    }

    /// Run the stage to completion, observing `cancellable`. Skipped if
    /// `query` reported the stage already complete.
    async fn build(&self, cancellable: Cancellable) -> Result<()>;

    /// Undo whatever `build` produced, without necessarily removing it from
    /// disk (e.g. `make clean`). Default is a no-op.
    async fn clean(&self, _cancellable: Cancellable) -> Result<()> {
        Ok(())
    }

    /// Remove everything this stage produced on disk, used by `foundry
    /// build --purge`-style flows. Default is a no-op: most stages
    /// (downloads, dependency resolution) have nothing to purge beyond what
    /// the pipeline's own directory reaper already sweeps.
    async fn purge(&self, _cancellable: Cancellable) -> Result<()> {
        Ok(())
    }
}

/// A `BuildStage` built from a plain async closure, for ad-hoc pipeline
/// steps wired up by CLI commands or tests that don't warrant their own
/// named type.
pub struct ClosureStage<F> {
    id: String,
    phase: Phase,
    run: F,
}

impl<F> ClosureStage<F> {
    pub fn new(id: impl Into<String>, phase: Phase, run: F) -> Self {
        ClosureStage {
            id: id.into(),
            phase,
            run,
        }
    }
}

#[async_trait]
impl<F> BuildStage for ClosureStage<F>
where
    F: Fn(Cancellable) -> crate::scheduler::FoundryFuture<()> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    async fn build(&self, cancellable: Cancellable) -> Result<()> {
        (self.run)(cancellable).await
    }
}
