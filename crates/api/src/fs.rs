//! Filesystem capability consumed by the interceptor.
//!
//! Everything the resolver, bundler and cache know about the disk goes through
//! [`FileSystem`], so the core can run against the real OS or an in-memory tree.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Result of a successful stat call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub modified: SystemTime,
    pub is_dir: bool,
}

impl FileStat {
    pub fn file(modified: SystemTime) -> Self {
        Self {
            modified,
            is_dir: false,
        }
    }

    pub fn dir(modified: SystemTime) -> Self {
        Self {
            modified,
            is_dir: true,
        }
    }

    pub fn is_file(&self) -> bool {
        !self.is_dir
    }
}

/// Raw, blocking filesystem primitives.
///
/// Implementations report missing paths as `io::ErrorKind::NotFound`; callers
/// decide whether that is an error or an ordinary "does not exist".
pub trait FileSystem: Send + Sync {
    /// Stat a path (following symlinks)
    fn metadata(&self, path: &Path) -> io::Result<FileStat>;

    /// List entry names of a directory, in whatever order the backend yields them
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Read a file as UTF-8 text
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write (create or truncate) a file
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Create a directory and all missing parents
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// Join a request path such as `/app/main.js` onto a root directory.
///
/// Leading slashes are dropped so the result always stays under `root`
/// (`Path::join` would otherwise replace the root with an absolute path).
pub fn join_request_path(root: &Path, request_path: &str) -> PathBuf {
    let mut joined = root.to_path_buf();
    for segment in request_path.split('/').filter(|s| !s.is_empty()) {
        joined.push(segment);
    }
    joined
}
