//! Filesystem queries shared by both ends of a transfer.

use std::io;
use std::path::Path;

/// Coarse classification of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A regular file.
    Regular,
    /// A directory.
    Directory,
    /// Anything else: sockets, FIFOs, devices.
    Other,
}

/// Kind and size of an entry, taken from a single `metadata` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileProbe {
    /// Entry kind, following symlinks.
    pub kind: FileKind,
    /// Size in bytes.
    pub size: u64,
}

/// Stat a path, following symlinks.
pub fn probe(path: &Path) -> io::Result<FileProbe> {
    let metadata = std::fs::metadata(path)?;
    let file_type = metadata.file_type();
    let kind = if file_type.is_file() {
        FileKind::Regular
    } else if file_type.is_dir() {
        FileKind::Directory
    } else {
        FileKind::Other
    };

    Ok(FileProbe {
        kind,
        size: metadata.len(),
    })
}

/// Whether anything exists at `path`.
///
/// A dangling symlink counts as existing, so an upload never replaces it.
pub fn exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

/// Whether `path` names a regular file.
pub fn is_regular_file(path: &Path) -> io::Result<bool> {
    Ok(probe(path)?.kind == FileKind::Regular)
}

/// Size of the entry at `path`.
pub fn file_size(path: &Path) -> io::Result<u64> {
    Ok(probe(path)?.size)
}

/// Last component of a slash-separated path.
///
/// Returns `None` for an empty path or one ending in `/`, which name no file.
pub fn extract_file_name(path: &str) -> Option<&str> {
    let name = match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    };
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Human-readable description of an I/O error, as sent to peers.
///
/// Strips the ` (os error N)` suffix the standard library appends, leaving
/// the platform's own message.
pub fn describe_io_error(err: &io::Error) -> String {
    let text = err.to_string();
    if err.raw_os_error().is_some() {
        if let Some(idx) = text.rfind(" (os error ") {
            return text[..idx].to_string();
        }
    }
    text
}
