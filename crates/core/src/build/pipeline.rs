//! `BuildPipeline`: runs a set of `BuildStage`s selected by a phase mask.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;
use tracing::instrument;

use crate::build::phase::{Phase, ORDERED_PHASES};
use crate::build::progress::BuildProgress;
use crate::build::stage::BuildStage;
use crate::errors::Result;
use crate::scheduler::Cancellable;
use crate::util::DirectoryReaper;

/// An ordered collection of `BuildStage`s, run against a caller-supplied
/// phase mask.
///
/// Stages are free to attach/detach at runtime (a plugin may add a stage
/// after the pipeline is constructed); `run` always re-reads the current
/// stage list each time it's invoked rather than caching an ordering.
pub struct BuildPipeline {
    stages: Vec<Arc<dyn BuildStage>>,
    diagnostic_patterns: Vec<Regex>,
    builddir: Option<PathBuf>,
    /// `phase -> (project directory, phase)` links attached via `foundry
    /// pipeline link`, letting one project's phase depend on another
    /// project's build finishing first.
    links: HashMap<Phase, Vec<(PathBuf, Phase)>>,
}

impl Default for BuildPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildPipeline {
    pub fn new() -> Self {
        BuildPipeline {
            stages: Vec::new(),
            diagnostic_patterns: Vec::new(),
            builddir: None,
            links: HashMap::new(),
        }
    }

    pub fn with_diagnostic_patterns(mut self, patterns: Vec<Regex>) -> Self {
        self.diagnostic_patterns = patterns;
        self
    }

    /// Set the pipeline's build directory, swept by `purge()` after every
    /// stage's own `purge` has settled.
    pub fn with_builddir(mut self, builddir: impl Into<PathBuf>) -> Self {
        self.builddir = Some(builddir.into());
        self
    }

    pub fn add_stage(&mut self, stage: Arc<dyn BuildStage>) {
        self.stages.push(stage);
    }

    pub fn link(&mut self, phase: Phase, project_directory: PathBuf, linked_phase: Phase) {
        self.links
            .entry(phase)
            .or_default()
            .push((project_directory, linked_phase));
    }

    pub fn unlink(&mut self, phase: Phase, project_directory: &std::path::Path) {
        if let Some(links) = self.links.get_mut(&phase) {
            links.retain(|(dir, _)| dir != project_directory);
        }
    }

    pub fn links_for(&self, phase: Phase) -> &[(PathBuf, Phase)] {
        self.links.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Run every stage whose phase bit is set in `phase_mask`, in increasing
    /// phase order. A stage whose `query` reports it already complete has
    /// its `build` skipped for this run; a `query` failure is logged and
    /// treated as incomplete.
    #[instrument(skip(self, cancellable), fields(mask = ?phase_mask))]
    pub async fn run(
        &self,
        phase_mask: Phase,
        cancellable: Cancellable,
    ) -> Result<Arc<BuildProgress>> {
        let progress = BuildProgress::new(phase_mask, self.diagnostic_patterns.clone());

        for phase in ORDERED_PHASES {
            if !phase_mask.contains(phase) {
                continue;
            }
            for stage in self.stages.iter().filter(|s| s.phase() == phase) {
                cancellable.raise_if_cancelled()?;
                progress.set_current_stage(stage.id());

                let completed = match stage.query(cancellable.clone()).await {
                    Ok(completed) => completed,
                    Err(e) => {
                        tracing::warn!(stage = stage.id(), error = %e, "stage query failed, proceeding as incomplete");
                        false
                    }
                };
                if completed {
                    tracing::debug!(stage = stage.id(), ?phase, "stage already complete, skipping build");
                    continue;
                }

                tracing::debug!(stage = stage.id(), ?phase, "running build stage");
                stage.build(cancellable.clone()).await?;
            }
        }

        Ok(progress)
    }

    /// Undo artifacts for every stage whose phase bit is set in
    /// `phase_mask`, in decreasing phase order.
    pub async fn clean(&self, phase_mask: Phase, cancellable: Cancellable) -> Result<()> {
        for phase in ORDERED_PHASES.iter().rev() {
            if !phase_mask.contains(*phase) {
                continue;
            }
            for stage in self.stages.iter().rev().filter(|s| s.phase() == *phase) {
                stage.clean(cancellable.clone()).await?;
            }
        }
        Ok(())
    }

    /// Remove everything every selected stage produced on disk, in
    /// decreasing phase order, then sweep the pipeline's build directory
    /// with a [`DirectoryReaper`] once every stage's `purge` has settled.
    pub async fn purge(&self, phase_mask: Phase, cancellable: Cancellable) -> Result<()> {
        for phase in ORDERED_PHASES.iter().rev() {
            if !phase_mask.contains(*phase) {
                continue;
            }
            for stage in self.stages.iter().rev().filter(|s| s.phase() == *phase) {
                stage.purge(cancellable.clone()).await?;
            }
        }

        if let Some(builddir) = &self.builddir {
            let mut reaper = DirectoryReaper::new();
            reaper.add_directory(builddir);
            reaper.execute().await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::stage::ClosureStage;
    use crate::scheduler::boxed;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[tokio::test]
    async fn runs_stages_in_phase_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut pipeline = BuildPipeline::new();
        let order2 = Arc::clone(&order);
        pipeline.add_stage(Arc::new(ClosureStage::new("build-step", Phase::BUILD, move |_| {
            let order2 = Arc::clone(&order2);
            boxed(async move {
                order2.lock().unwrap().push("build-step");
                Ok(())
            })
        })));
        let order3 = Arc::clone(&order);
        pipeline.add_stage(Arc::new(ClosureStage::new("configure-step", Phase::CONFIGURE, move |_| {
            let order3 = Arc::clone(&order3);
            boxed(async move {
                order3.lock().unwrap().push("configure-step");
                Ok(())
            })
        })));
        let order4 = Arc::clone(&order);
        pipeline.add_stage(Arc::new(ClosureStage::new("downloads-step", Phase::DOWNLOADS, move |_| {
            let order4 = Arc::clone(&order4);
            boxed(async move {
                order4.lock().unwrap().push("downloads-step");
                Ok(())
            })
        })));

        let mask = Phase::BUILD | Phase::CONFIGURE | Phase::DOWNLOADS;
        pipeline.run(mask, Cancellable::new()).await.unwrap();
        let ran = order.lock().unwrap().clone();
        assert_eq!(ran, vec!["downloads-step", "configure-step", "build-step"]);
    }

    #[tokio::test]
    async fn mask_without_a_phase_bit_skips_its_stages() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut pipeline = BuildPipeline::new();
        let count2 = Arc::clone(&count);
        pipeline.add_stage(Arc::new(ClosureStage::new("install-step", Phase::INSTALL, move |_| {
            let count2 = Arc::clone(&count2);
            boxed(async move {
                count2.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })));

        pipeline.run(Phase::BUILD, Cancellable::new()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_run() {
        let mut pipeline = BuildPipeline::new();
        pipeline.add_stage(Arc::new(ClosureStage::new("step", Phase::BUILD, |_| {
            boxed(async { Ok(()) })
        })));
        let cancellable = Cancellable::new();
        cancellable.cancel();
        let err = pipeline.run(Phase::BUILD, cancellable).await.unwrap_err();
        assert!(matches!(err, crate::errors::FoundryError::Cancelled));
    }

    struct AlreadyCompleteStage {
        built: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl BuildStage for AlreadyCompleteStage {
        fn id(&self) -> &str {
            "already-complete"
        }

        fn phase(&self) -> Phase {
            Phase::BUILD
        }

        async fn query(&self, _cancellable: Cancellable) -> Result<bool> {
            Ok(true)
        }

        async fn build(&self, _cancellable: Cancellable) -> Result<()> {
            self.built.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn query_reporting_complete_skips_build() {
        let built = Arc::new(AtomicBool::new(false));
        let mut pipeline = BuildPipeline::new();
        pipeline.add_stage(Arc::new(AlreadyCompleteStage { built: Arc::clone(&built) }));
        pipeline.run(Phase::BUILD, Cancellable::new()).await.unwrap();
        assert!(!built.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn purge_sweeps_the_build_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let builddir = tmp.path().join("_build");
        std::fs::create_dir(&builddir).unwrap();
        std::fs::write(builddir.join("obj.o"), b"x").unwrap();

        let pipeline = BuildPipeline::new().with_builddir(&builddir);
        pipeline.purge(Phase::BUILD, Cancellable::new()).await.unwrap();

        assert!(!builddir.exists());
    }
}
