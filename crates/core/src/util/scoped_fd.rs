//! A file descriptor guard that closes on drop, used where a PTY/pipe fd
//! needs to outlive the `Pty`/`Child` struct that allocated it but must
//! still be guaranteed to close exactly once.

#[cfg(unix)]
mod unix_impl {
    use std::os::fd::{IntoRawFd, OwnedFd, RawFd};

    /// Owns a raw fd, closing it on drop. A thin, explicit wrapper over
    /// [`OwnedFd`] for call sites that want to talk about "a scoped fd" by
    /// name, matching the original's `foundry_scoped_fd` vocabulary.
    pub struct ScopedFd(OwnedFd);

    impl ScopedFd {
        pub fn new(fd: OwnedFd) -> Self {
            ScopedFd(fd)
        }

        pub fn as_raw_fd(&self) -> RawFd {
            use std::os::fd::AsRawFd;
            self.0.as_raw_fd()
        }

        /// Release ownership, returning the raw fd without closing it.
        pub fn into_raw_fd(self) -> RawFd {
            self.0.into_raw_fd()
        }
    }
}

#[cfg(unix)]
pub use unix_impl::ScopedFd;
