use getsmart_api::{CachedUrlSummary, EntryKind};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

/// Filesystem state observed when an artifact was built
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceState {
    SingleFile {
        path: PathBuf,
        mtime: SystemTime,
    },
    AlternateSource {
        path: PathBuf,
        mtime: SystemTime,
    },
    /// Key set is the member enumeration at build time
    Bundle {
        dir: PathBuf,
        members: BTreeMap<PathBuf, SystemTime>,
    },
}

impl SourceState {
    pub fn kind(&self) -> EntryKind {
        match self {
            SourceState::SingleFile { .. } => EntryKind::SingleFile,
            SourceState::AlternateSource { .. } => EntryKind::AlternateSource,
            SourceState::Bundle { .. } => EntryKind::Bundle,
        }
    }

    pub fn source_path(&self) -> &PathBuf {
        match self {
            SourceState::SingleFile { path, .. } | SourceState::AlternateSource { path, .. } => path,
            SourceState::Bundle { dir, .. } => dir,
        }
    }

    pub fn member_count(&self) -> usize {
        match self {
            SourceState::Bundle { members, .. } => members.len(),
            _ => 1,
        }
    }
}

/// A committed cache entry. Only ever created together with its artifact.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub source: SourceState,
    pub artifact: Arc<str>,
}

impl CacheEntry {
    pub fn summary(&self, url: &str) -> CachedUrlSummary {
        CachedUrlSummary {
            url: url.to_string(),
            kind: self.source.kind(),
            source: self.source.source_path().clone(),
            member_count: self.source.member_count(),
            artifact_bytes: self.artifact.len(),
        }
    }
}
