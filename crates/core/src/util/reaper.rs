//! `DirectoryReaper`: collects a set of files/directories and removes them
//! together, used by `BuildPipeline::purge` to sweep a stale build
//! directory after every stage's own `purge` has settled.

use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::errors::Result;

#[derive(Clone)]
enum Target {
    File(PathBuf),
    Directory(PathBuf),
}

/// Accumulates paths to remove, then removes them all in one `execute()`
/// call. Paths are tracked rather than removed immediately so a caller can
/// register several things (a build directory, a few stray files) and
/// reap them as a single unit once every stage has had a chance to add to
/// the list.
#[derive(Default)]
pub struct DirectoryReaper {
    targets: Vec<Target>,
}

impl DirectoryReaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_directory(&mut self, path: impl Into<PathBuf>) {
        self.targets.push(Target::Directory(path.into()));
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>) {
        self.targets.push(Target::File(path.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Remove every tracked path. Missing paths are not an error — a stage
    /// may have already cleaned up what it produced.
    #[instrument(skip(self))]
    pub async fn execute(&self) -> Result<()> {
        for target in &self.targets {
            match target {
                Target::Directory(path) => remove_dir(path).await?,
                Target::File(path) => remove_file(path).await?,
            }
        }
        Ok(())
    }
}

async fn remove_dir(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn remove_file(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
