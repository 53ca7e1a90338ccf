//! Whole-file file-system capability.
//!
//! [`DirectManager`](crate::DirectManager) only needs a handful of
//! whole-file operations, so it goes through [`WholeFileFs`] instead of
//! `std::fs`. That keeps the state machine usable against a different OS
//! instance (or a test directory) without touching its logic.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File operations needed to manage `resolv.conf`.
///
/// All paths are absolute.
pub trait WholeFileFs {
    /// Returns whether `path` is a regular file (not a symlink or device).
    ///
    /// # Errors
    ///
    /// Returns an error of kind `NotFound` if `path` does not exist.
    fn stat(&self, path: &Path) -> io::Result<bool>;

    /// Reads the full content of `path`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Creates or overwrites `path` with `contents`. `mode` applies when
    /// the file is created.
    ///
    /// # Errors
    ///
    /// Returns any I/O error.
    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()>;

    /// Renames `from` to `to`, replacing `to`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error, including cross-device failures.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Removes `path`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Truncates `path` to zero length.
    ///
    /// # Errors
    ///
    /// Returns any I/O error.
    fn truncate(&self, path: &Path) -> io::Result<()>;
}

/// [`WholeFileFs`] backed by the local OS.
///
/// With a prefix, every absolute path is resolved under it, so
/// `/etc/resolv.conf` becomes `<prefix>/etc/resolv.conf`.
#[derive(Debug, Clone, Default)]
pub struct DirectFs {
    prefix: Option<PathBuf>,
}

impl DirectFs {
    /// Operates on the real root file system.
    #[must_use]
    pub const fn new() -> Self {
        Self { prefix: None }
    }

    /// Roots every path under `prefix` (useful for testing).
    #[must_use]
    pub fn with_prefix(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn path(&self, name: &Path) -> PathBuf {
        match &self.prefix {
            Some(prefix) => prefix.join(name.strip_prefix("/").unwrap_or(name)),
            None => name.to_path_buf(),
        }
    }
}

impl WholeFileFs for DirectFs {
    fn stat(&self, path: &Path) -> io::Result<bool> {
        Ok(std::fs::symlink_metadata(self.path(path))?.file_type().is_file())
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(self.path(path))
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
        let mut opts = OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        let mut file = opts.open(self.path(path))?;
        file.write_all(contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(self.path(from), self.path(to))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(self.path(path))
    }

    fn truncate(&self, path: &Path) -> io::Result<()> {
        OpenOptions::new().write(true).open(self.path(path))?.set_len(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_roots_absolute_paths() {
        let fs = DirectFs::with_prefix("/tmp/root");
        assert_eq!(
            fs.path(Path::new("/etc/resolv.conf")),
            PathBuf::from("/tmp/root/etc/resolv.conf")
        );
        assert_eq!(
            DirectFs::new().path(Path::new("/etc/resolv.conf")),
            PathBuf::from("/etc/resolv.conf")
        );
    }

    #[test]
    fn whole_file_operations() {
        let dir = tempfile::tempdir().unwrap();
        let fs = DirectFs::with_prefix(dir.path());
        let a = Path::new("/a");
        let b = Path::new("/b");

        let err = fs.stat(a).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        fs.write_file(a, b"hello", 0o644).unwrap();
        assert!(fs.stat(a).unwrap());
        assert_eq!(fs.read_file(a).unwrap(), b"hello");

        fs.rename(a, b).unwrap();
        assert!(!dir.path().join("a").exists());
        assert_eq!(fs.read_file(b).unwrap(), b"hello");

        fs.truncate(b).unwrap();
        assert!(fs.read_file(b).unwrap().is_empty());

        fs.remove(b).unwrap();
        assert!(!dir.path().join("b").exists());
    }

    #[test]
    fn stat_reports_directory_as_irregular() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("etc")).unwrap();
        let fs = DirectFs::with_prefix(dir.path());
        assert!(!fs.stat(Path::new("/etc")).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn stat_reports_symlink_as_irregular() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("target"), "nameserver 1.1.1.1\n").unwrap();
        std::os::unix::fs::symlink(dir.path().join("target"), dir.path().join("link")).unwrap();
        let fs = DirectFs::with_prefix(dir.path());
        assert!(!fs.stat(Path::new("/link")).unwrap());
        assert!(fs.stat(Path::new("/target")).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn write_applies_mode_on_create() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let fs = DirectFs::with_prefix(dir.path());
        fs.write_file(Path::new("/f"), b"x", 0o600).unwrap();
        let mode = std::fs::metadata(dir.path().join("f")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
