//! The phased build pipeline: stages, phases, PTY capture, and diagnostic
//! extraction.

pub mod diagnostics;
pub mod phase;
pub mod pipeline;
pub mod progress;
pub mod pty;
pub mod stage;

pub use phase::{Phase, ORDERED_PHASES};
pub use pipeline::BuildPipeline;
pub use progress::BuildProgress;
pub use stage::BuildStage;
