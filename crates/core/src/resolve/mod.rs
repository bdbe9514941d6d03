//! Maps a script request path onto the source tree.

use crate::config::InterceptorConfig;
use crate::fs::FileSystemProbe;
use getsmart_api::{EntryKind, join_request_path};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;

/// Where a request path points in the source tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `src/<path>.js` exists
    SingleFile { path: PathBuf, mtime: SystemTime },
    /// `src/<path>.<alt>` exists and needs compiling
    AlternateSource { path: PathBuf, mtime: SystemTime },
    /// `src/<path>/` exists and is bundled
    DirectoryCandidate { dir: PathBuf },
    NotFound,
}

impl Resolution {
    pub fn kind(&self) -> Option<EntryKind> {
        match self {
            Resolution::SingleFile { .. } => Some(EntryKind::SingleFile),
            Resolution::AlternateSource { .. } => Some(EntryKind::AlternateSource),
            Resolution::DirectoryCandidate { .. } => Some(EntryKind::Bundle),
            Resolution::NotFound => None,
        }
    }

    /// Source file or directory backing this resolution
    pub fn source_path(&self) -> Option<&Path> {
        match self {
            Resolution::SingleFile { path, .. } | Resolution::AlternateSource { path, .. } => {
                Some(path)
            }
            Resolution::DirectoryCandidate { dir } => Some(dir),
            Resolution::NotFound => None,
        }
    }
}

#[derive(Clone)]
pub struct PathClassifier {
    probe: FileSystemProbe,
    src: PathBuf,
    script_suffix: String,
    alternate_extension: Option<String>,
}

impl PathClassifier {
    pub fn new(probe: FileSystemProbe, config: &InterceptorConfig) -> Self {
        Self {
            probe,
            src: config.src.clone(),
            script_suffix: config.script_suffix(),
            alternate_extension: config.alternate_extension.clone(),
        }
    }

    pub fn src(&self) -> &Path {
        &self.src
    }

    /// Resolve `request_path` (query already stripped).
    ///
    /// First match wins: literal file, alternate-source file, directory.
    pub fn classify(&self, request_path: &str) -> Resolution {
        let Some(stem) = request_path.strip_suffix(self.script_suffix.as_str()) else {
            return Resolution::NotFound;
        };

        let file = join_request_path(&self.src, request_path);
        if let Some(mtime) = self.probe.file_mtime(&file) {
            trace!("{} resolved to file {:?}", request_path, file);
            return Resolution::SingleFile { path: file, mtime };
        }

        if let Some(alt) = &self.alternate_extension {
            let alt_path = join_request_path(&self.src, &format!("{}.{}", stem, alt));
            if let Some(mtime) = self.probe.file_mtime(&alt_path) {
                trace!("{} resolved to alternate source {:?}", request_path, alt_path);
                return Resolution::AlternateSource {
                    path: alt_path,
                    mtime,
                };
            }
        }

        // `/.js` or `/lib/.js` would otherwise bundle the parent directory
        if stem.is_empty() || stem.ends_with('/') {
            return Resolution::NotFound;
        }

        let dir = join_request_path(&self.src, stem);
        if self.probe.is_dir(&dir) {
            trace!("{} resolved to directory {:?}", request_path, dir);
            return Resolution::DirectoryCandidate { dir };
        }

        Resolution::NotFound
    }
}
