//! In-memory `FileSystem` with explicit modification times.
//!
//! Used by the test suites to drive staleness scenarios without sleeping on
//! real mtimes, and to count how often each file is actually read.

use getsmart_api::{FileStat, FileSystem};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
enum Node {
    File { contents: String, modified: SystemTime },
    Dir { modified: SystemTime },
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<PathBuf, Node>,
    reads: HashMap<PathBuf, usize>,
    unreadable: HashSet<PathBuf>,
    read_only: bool,
}

#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<State>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// `UNIX_EPOCH + secs`
    pub fn time(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    /// Create or replace a file, creating its parent directories
    pub fn add_file(&self, path: impl AsRef<Path>, contents: &str, mtime_secs: u64) {
        let path = path.as_ref();
        let modified = Self::time(mtime_secs);
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            insert_dirs(&mut state.nodes, parent, modified);
        }
        state.nodes.insert(
            path.to_path_buf(),
            Node::File {
                contents: contents.to_string(),
                modified,
            },
        );
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.lock();
        insert_dirs(&mut state.nodes, path.as_ref(), Self::time(0));
    }

    /// Remove a file or a whole directory subtree
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.lock()
            .nodes
            .retain(|candidate, _| !candidate.starts_with(path));
    }

    /// Make reads of `path` fail with `PermissionDenied` while stat keeps working
    pub fn make_unreadable(&self, path: impl AsRef<Path>) {
        self.lock().unreadable.insert(path.as_ref().to_path_buf());
    }

    /// Undo [`make_unreadable`](Self::make_unreadable) without touching the mtime
    pub fn make_readable(&self, path: impl AsRef<Path>) {
        self.lock().unreadable.remove(path.as_ref());
    }

    /// Make every write and mkdir fail with `PermissionDenied`
    pub fn set_read_only(&self, read_only: bool) {
        self.lock().read_only = read_only;
    }

    /// Number of successful `read_to_string` calls for `path`
    pub fn read_count(&self, path: impl AsRef<Path>) -> usize {
        self.lock().reads.get(path.as_ref()).copied().unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.lock().reads.values().sum()
    }

    /// Current contents of a file, without counting as a read
    pub fn contents(&self, path: &Path) -> Option<String> {
        match self.lock().nodes.get(path) {
            Some(Node::File { contents, .. }) => Some(contents.clone()),
            _ => None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn insert_dirs(nodes: &mut BTreeMap<PathBuf, Node>, dir: &Path, modified: SystemTime) {
    for ancestor in dir.ancestors() {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        nodes
            .entry(ancestor.to_path_buf())
            .or_insert(Node::Dir { modified });
    }
}

impl FileSystem for MemoryFileSystem {
    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        match self.lock().nodes.get(path) {
            Some(Node::File { modified, .. }) => Ok(FileStat::file(*modified)),
            Some(Node::Dir { modified }) => Ok(FileStat::dir(*modified)),
            None => Err(not_found(path)),
        }
    }

    /// Children come back in reverse name order so callers cannot lean on it
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let state = self.lock();
        match state.nodes.get(path) {
            Some(Node::Dir { .. }) => {}
            Some(Node::File { .. }) => {
                return Err(io::Error::other(format!(
                    "{} is not a directory",
                    path.display()
                )));
            }
            None => return Err(not_found(path)),
        }

        let mut names: Vec<String> = state
            .nodes
            .keys()
            .filter(|candidate| candidate.parent() == Some(path))
            .filter_map(|candidate| candidate.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        names.reverse();
        Ok(names)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let mut state = self.lock();
        if state.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is unreadable", path.display()),
            ));
        }
        let contents = match state.nodes.get(path) {
            Some(Node::File { contents, .. }) => contents.clone(),
            Some(Node::Dir { .. }) => {
                return Err(io::Error::other(format!(
                    "{} is a directory",
                    path.display()
                )));
            }
            None => return Err(not_found(path)),
        };
        *state.reads.entry(path.to_path_buf()).or_insert(0) += 1;
        Ok(contents)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut state = self.lock();
        if state.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "filesystem is read-only",
            ));
        }
        let parent_is_dir = path
            .parent()
            .map(|parent| matches!(state.nodes.get(parent), Some(Node::Dir { .. })))
            .unwrap_or(true);
        if !parent_is_dir {
            return Err(not_found(path));
        }
        state.nodes.insert(
            path.to_path_buf(),
            Node::File {
                contents: contents.to_string(),
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "filesystem is read-only",
            ));
        }
        insert_dirs(&mut state.nodes, path, SystemTime::now());
        Ok(())
    }
}
