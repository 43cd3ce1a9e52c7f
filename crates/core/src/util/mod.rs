//! Small shared utilities with no home of their own.

pub mod jsonrpc;
pub mod mkdtemp;
pub mod reaper;

pub use reaper::DirectoryReaper;

#[cfg(unix)]
pub mod scoped_fd;
