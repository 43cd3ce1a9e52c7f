//! Scratch-directory creation, the `mkdtemp`-style utility other subsystems
//! (build stage sandboxes, plugin extraction) use for disposable working
//! directories.

use std::path::PathBuf;

use crate::errors::Result;

/// Create a fresh, empty directory under `parent` named
/// `<prefix>-<random suffix>`, returning its path.
pub fn mkdtemp(parent: &std::path::Path, prefix: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(parent)?;
    loop {
        let suffix: String = (0..8)
            .map(|_| {
                let n = fastrand::u8(0..36);
                if n < 10 {
                    (b'0' + n) as char
                } else {
                    (b'a' + (n - 10)) as char
                }
            })
            .collect();
        let candidate = parent.join(format!("{prefix}-{suffix}"));
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_unique_directories() {
        let parent = tempfile::tempdir().unwrap();
        let a = mkdtemp(parent.path(), "foundry-build").unwrap();
        let b = mkdtemp(parent.path(), "foundry-build").unwrap();
        assert!(a.is_dir());
        assert!(b.is_dir());
        assert_ne!(a, b);
    }
}
