//! Query surface over the `FileSystem` capability.
//!
//! A stat that fails is the common case here (most candidate paths do not
//! exist), so it comes back as `None` instead of an error.

use getsmart_api::{FileStat, FileSystem};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

#[derive(Clone)]
pub struct FileSystemProbe {
    fs: Arc<dyn FileSystem>,
}

impl FileSystemProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn stat(&self, path: &Path) -> Option<FileStat> {
        match self.fs.metadata(path) {
            Ok(stat) => Some(stat),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                debug!("Treating unreadable path {:?} as missing: {}", path, e);
                None
            }
        }
    }

    /// Modification time of a regular file; `None` for directories and missing paths
    pub fn file_mtime(&self, path: &Path) -> Option<SystemTime> {
        self.stat(path)
            .filter(FileStat::is_file)
            .map(|stat| stat.modified)
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        self.stat(path).map(|stat| stat.is_dir).unwrap_or(false)
    }

    pub fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        self.fs.read_dir(path)
    }

    pub fn read(&self, path: &Path) -> io::Result<String> {
        self.fs.read_to_string(path)
    }

    /// Write a file, creating any missing parent directories first
    pub fn write_creating_dirs(&self, path: &Path, contents: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !self.is_dir(parent) {
                self.fs.create_dir_all(parent)?;
            }
        }
        self.fs.write(path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn test_missing_path_is_none() {
        let fs = Arc::new(MemoryFileSystem::new());
        let probe = FileSystemProbe::new(fs);
        assert!(probe.stat(Path::new("/nope.js")).is_none());
        assert!(probe.file_mtime(Path::new("/nope.js")).is_none());
        assert!(!probe.is_dir(Path::new("/nope")));
    }

    #[test]
    fn test_file_mtime_ignores_directories() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app/a.js", "var a;", 5);
        let probe = FileSystemProbe::new(fs);

        assert_eq!(
            probe.file_mtime(Path::new("/src/app/a.js")),
            Some(MemoryFileSystem::time(5))
        );
        assert!(probe.file_mtime(Path::new("/src/app")).is_none());
        assert!(probe.is_dir(Path::new("/src/app")));
    }

    #[test]
    fn test_write_creates_parents() {
        let fs = Arc::new(MemoryFileSystem::new());
        let probe = FileSystemProbe::new(fs.clone());

        probe
            .write_creating_dirs(Path::new("/dest/nested/deep/app.js"), "x")
            .unwrap();
        assert!(probe.is_dir(Path::new("/dest/nested/deep")));
        assert_eq!(
            fs.contents(Path::new("/dest/nested/deep/app.js")).as_deref(),
            Some("x")
        );
    }
}
