//! PTY allocation for build stages whose subprocesses need to believe
//! they're talking to a terminal (compilers that colorize output only when
//! attached to a tty, `make`'s job-server heuristics, etc).

#[cfg(unix)]
mod unix_impl {
    use std::os::fd::{AsRawFd, OwnedFd};

    use nix::pty::{openpty, OpenptyResult};

    use crate::errors::{FoundryError, Result};

    /// A PTY controller/follower pair. `controller` is read by
    /// [`super::progress::BuildProgress`] to capture build output;
    /// `follower` is attached to the spawned subprocess as its stdout/stderr.
    pub struct Pty {
        pub controller: OwnedFd,
        pub follower: OwnedFd,
    }

    impl Pty {
        pub fn open() -> Result<Pty> {
            let OpenptyResult { master, slave } =
                openpty(None, None).map_err(|e| FoundryError::invalid_data(e.to_string()))?;
            Ok(Pty {
                controller: master,
                follower: slave,
            })
        }

        pub fn controller_fd(&self) -> i32 {
            self.controller.as_raw_fd()
        }

        pub fn follower_fd(&self) -> i32 {
            self.follower.as_raw_fd()
        }
    }
}

#[cfg(unix)]
pub use unix_impl::Pty;

#[cfg(not(unix))]
mod stub {
    use crate::errors::{FoundryError, Result};

    /// Non-unix platforms have no PTY concept; stages fall back to plain
    /// piped stdout/stderr instead (see
    /// [`super::progress::BuildProgress::spawn_piped`]).
    pub struct Pty;

    impl Pty {
        pub fn open() -> Result<Pty> {
            Err(FoundryError::NotSupported)
        }
    }
}

#[cfg(not(unix))]
pub use stub::Pty;
