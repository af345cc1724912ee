//! Per-session working directory.
//!
//! Each session carries its own [`DirectoryContext`]. Relative paths in
//! commands resolve against it, and directory changes only ever touch the
//! context, never the process working directory, so concurrent sessions
//! cannot observe each other's location.

use std::io;
use std::path::{Path, PathBuf};

/// Reply sent after a successful directory change.
pub const CHANGE_DIR_SUCCESS: &str = "Directory Changed.";

/// The working directory of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryContext {
    cwd: PathBuf,
}

impl DirectoryContext {
    /// Create a context rooted at `cwd`.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Create a context at the process's current directory.
    pub fn from_current_dir() -> io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// The current directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Resolve `path` against the current directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Resolve a path argument taken from a command line.
    ///
    /// An empty argument names nothing, so it fails with `NotFound` rather
    /// than resolving to the current directory.
    pub fn locate(&self, path: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "No such file or directory",
            ));
        }
        Ok(self.resolve(path))
    }

    /// Change to `path`.
    ///
    /// The target is canonicalized, so `..` and symlinks are collapsed. On
    /// error the context is left untouched.
    pub fn change(&mut self, path: impl AsRef<Path>) -> io::Result<()> {
        let target = std::fs::canonicalize(self.locate(path)?)?;
        if !target.is_dir() {
            return Err(io::Error::new(io::ErrorKind::NotADirectory, "Not a directory"));
        }
        self.cwd = target;
        Ok(())
    }
}
