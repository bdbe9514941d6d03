use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of source backing a cached URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    SingleFile,
    AlternateSource,
    Bundle,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::SingleFile => "file",
            EntryKind::AlternateSource => "alternate",
            EntryKind::Bundle => "bundle",
        }
    }
}

/// Summary of one cached URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedUrlSummary {
    pub url: String,
    pub kind: EntryKind,
    pub source: PathBuf,
    pub member_count: usize,
    pub artifact_bytes: usize,
}

/// Statistics for the in-memory staleness cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub single_files: usize,
    pub alternate_sources: usize,
    pub bundles: usize,
    pub hits: u64,
    pub stale: u64,
    pub misses: u64,
}

/// Read-only inspection surface over the staleness cache
pub trait CacheInspector: Send + Sync {
    /// Get cache statistics
    fn stats(&self) -> CacheStats;

    /// Summaries of every cached URL, sorted by URL
    fn entries(&self) -> Vec<CachedUrlSummary>;
}
