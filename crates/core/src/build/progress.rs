//! `BuildProgress`: drives a single pipeline run's subprocess output through
//! the PTY, tracking current directory and surfacing diagnostic matches.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::instrument;

use crate::build::diagnostics::{
    match_diagnostic, strip_ansi_colors, DiagnosticMatch, DirectoryTracker,
};
use crate::build::phase::Phase;
use crate::errors::Result;

/// One line of build output, after color-stripping, paired with the
/// directory it was attributed to.
#[derive(Debug, Clone)]
pub struct BuildLine {
    pub phase: Phase,
    pub directory: Option<String>,
    pub text: String,
}

/// Tracks the state of an in-flight (or completed) pipeline run: the target
/// phase mask, the current stage, and a channel of [`BuildLine`]s and
/// [`DiagnosticMatch`]es for a consumer (the CLI, a plugin) to render.
pub struct BuildProgress {
    target_phase: Phase,
    current_stage: StdMutex<Option<String>>,
    diagnostic_patterns: Vec<Regex>,
    lines_tx: mpsc::UnboundedSender<BuildLine>,
    lines_rx: Mutex<Option<mpsc::UnboundedReceiver<BuildLine>>>,
    diagnostics_tx: mpsc::UnboundedSender<DiagnosticMatch>,
    diagnostics_rx: Mutex<Option<mpsc::UnboundedReceiver<DiagnosticMatch>>>,
    directory: StdMutex<DirectoryTracker>,
}

impl BuildProgress {
    pub fn new(target_phase: Phase, diagnostic_patterns: Vec<Regex>) -> Arc<Self> {
        let (lines_tx, lines_rx) = mpsc::unbounded_channel();
        let (diagnostics_tx, diagnostics_rx) = mpsc::unbounded_channel();
        Arc::new(BuildProgress {
            target_phase,
            current_stage: StdMutex::new(None),
            diagnostic_patterns,
            lines_tx,
            lines_rx: Mutex::new(Some(lines_rx)),
            diagnostics_tx,
            diagnostics_rx: Mutex::new(Some(diagnostics_rx)),
            directory: StdMutex::new(DirectoryTracker::new()),
        })
    }

    pub fn target_phase(&self) -> Phase {
        self.target_phase
    }

    pub fn set_current_stage(&self, id: impl Into<String>) {
        *self.current_stage.lock().expect("progress lock poisoned") = Some(id.into());
    }

    pub fn current_stage(&self) -> Option<String> {
        self.current_stage.lock().expect("progress lock poisoned").clone()
    }

    /// Take the line stream, which a caller can poll (`recv().await`) for as
    /// long as the pipeline run is alive. Can only be taken once.
    pub async fn take_lines(&self) -> Option<mpsc::UnboundedReceiver<BuildLine>> {
        self.lines_rx.lock().await.take()
    }

    pub async fn take_diagnostics(&self) -> Option<mpsc::UnboundedReceiver<DiagnosticMatch>> {
        self.diagnostics_rx.lock().await.take()
    }

    /// Feed one raw (possibly ANSI-colored) line of stage output: strip
    /// colors, update the tracked directory, extract a diagnostic if the
    /// line matches, and forward both to any listening consumer.
    #[instrument(skip(self, raw_line))]
    fn process_line(&self, phase: Phase, raw_line: &str) {
        let clean = strip_ansi_colors(raw_line);
        self.directory
            .lock()
            .expect("progress lock poisoned")
            .observe(&clean);
        let directory = self
            .directory
            .lock()
            .expect("progress lock poisoned")
            .current_dir()
            .map(str::to_string);

        let _ = self.lines_tx.send(BuildLine {
            phase,
            directory,
            text: clean.clone(),
        });

        if let Some(diag) = match_diagnostic(&self.diagnostic_patterns, &clean) {
            let _ = self.diagnostics_tx.send(diag);
        }
    }

    /// Read `reader` line by line (typically the PTY controller side or a
    /// plain piped stdout), processing each line as it arrives. Returns once
    /// the reader reaches EOF.
    pub async fn drain<R: tokio::io::AsyncRead + Unpin>(
        self: &Arc<Self>,
        phase: Phase,
        reader: R,
    ) -> Result<()> {
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            self.process_line(phase, &line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_strips_colors_and_forwards_lines() {
        let progress = BuildProgress::new(Phase::BUILD, vec![]);
        let mut rx = progress.take_lines().await.unwrap();
        let input = std::io::Cursor::new(b"\x1b[31merror\x1b[0m: broke\n".to_vec());
        progress.drain(Phase::BUILD, input).await.unwrap();
        let line = rx.recv().await.unwrap();
        assert_eq!(line.text, "error: broke");
    }

    #[tokio::test]
    async fn drain_tracks_directory_across_lines() {
        let progress = BuildProgress::new(Phase::BUILD, vec![]);
        let mut rx = progress.take_lines().await.unwrap();
        let input = std::io::Cursor::new(
            b"make: Entering directory '/src'\ncompiling foo.c\n".to_vec(),
        );
        progress.drain(Phase::BUILD, input).await.unwrap();
        let _ = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(second.directory.as_deref(), Some("/src"));
    }

    #[tokio::test]
    async fn drain_surfaces_diagnostic_matches() {
        let patterns = vec![Regex::new(r"^(\S+):(\d+): error: (.*)$").unwrap()];
        let progress = BuildProgress::new(Phase::BUILD, patterns);
        let mut diags = progress.take_diagnostics().await.unwrap();
        let input = std::io::Cursor::new(b"main.c:10: error: oops\n".to_vec());
        progress.drain(Phase::BUILD, input).await.unwrap();
        let diag = diags.recv().await.unwrap();
        assert_eq!(diag.captures[0].as_deref(), Some("main.c"));
    }
}
