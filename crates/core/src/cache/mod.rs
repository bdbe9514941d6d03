//! Staleness cache keyed by request URL.
//!
//! Each entry remembers the modification times its artifact was built from.
//! In development mode every lookup re-resolves the URL and compares those
//! mtimes against the filesystem; in production mode an existing entry is
//! trusted as is, which assumes a redeploy restarts the process.

mod entry;
mod inflight;

pub use entry::{CacheEntry, SourceState};
pub use inflight::Inflight;

use crate::bundle::DirectoryBundler;
use crate::fs::FileSystemProbe;
use crate::resolve::{PathClassifier, Resolution};
use dashmap::DashMap;
use getsmart_api::{CacheInspector, CacheStats, CachedUrlSummary, EntryKind};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tracing::debug;

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Entry exists and still matches the filesystem (or is trusted)
    Fresh(Arc<str>),
    /// Entry exists but its sources changed
    Stale,
    /// No entry for this URL
    Absent,
}

pub struct StalenessCache {
    entries: DashMap<String, Arc<CacheEntry>>,
    classifier: PathClassifier,
    bundler: DirectoryBundler,
    probe: FileSystemProbe,
    trust_existing: bool,
    hits: AtomicU64,
    stale: AtomicU64,
    misses: AtomicU64,
}

impl StalenessCache {
    pub fn new(
        classifier: PathClassifier,
        bundler: DirectoryBundler,
        probe: FileSystemProbe,
        trust_existing: bool,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            classifier,
            bundler,
            probe,
            trust_existing,
            hits: AtomicU64::new(0),
            stale: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn check_and_get(&self, url: &str) -> CacheLookup {
        // Clone the Arc out so no shard lock is held across filesystem calls
        let Some(entry) = self.entries.get(url).map(|e| e.value().clone()) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return CacheLookup::Absent;
        };

        if self.trust_existing || self.is_current(url, &entry.source) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return CacheLookup::Fresh(entry.artifact.clone());
        }

        debug!("Cache entry for {} is stale", url);
        self.stale.fetch_add(1, Ordering::Relaxed);
        CacheLookup::Stale
    }

    /// Replace the entry for `url`
    pub fn commit(&self, url: &str, source: SourceState, artifact: Arc<str>) {
        debug!(
            "Caching {} ({}, {} bytes)",
            url,
            source.kind().as_str(),
            artifact.len()
        );
        self.entries.insert(url.to_string(), Arc::new(CacheEntry { source, artifact }));
    }

    pub fn get(&self, url: &str) -> Option<Arc<CacheEntry>> {
        self.entries.get(url).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-resolve `url` and compare against the recorded state.
    ///
    /// A different resolution (e.g. a literal file now shadowing a bundled
    /// directory) is stale even if the old sources are untouched.
    fn is_current(&self, url: &str, recorded: &SourceState) -> bool {
        match (recorded, self.classifier.classify(url)) {
            (
                SourceState::SingleFile { path, mtime },
                Resolution::SingleFile {
                    path: current_path,
                    mtime: current_mtime,
                },
            )
            | (
                SourceState::AlternateSource { path, mtime },
                Resolution::AlternateSource {
                    path: current_path,
                    mtime: current_mtime,
                },
            ) => *path == current_path && *mtime == current_mtime,
            (
                SourceState::Bundle { dir, members },
                Resolution::DirectoryCandidate { dir: current },
            ) => *dir == current && self.bundle_is_current(dir, members),
            _ => false,
        }
    }

    fn bundle_is_current(&self, dir: &Path, recorded: &BTreeMap<PathBuf, SystemTime>) -> bool {
        let current = match self.bundler.list_members(dir) {
            Ok(members) => members,
            Err(e) => {
                debug!("Bundle directory {:?} no longer listable: {}", dir, e);
                return false;
            }
        };

        // Added or removed members invalidate the bundle before any mtime is checked
        if current.len() != recorded.len()
            || !current.iter().all(|member| recorded.contains_key(member))
        {
            debug!("Member set of {:?} changed", dir);
            return false;
        }

        // First changed member wins; there is no partial rebuild
        current.iter().all(|member| {
            let unchanged = self.probe.file_mtime(member) == recorded.get(member).copied();
            if !unchanged {
                debug!("Bundle member {:?} changed", member);
            }
            unchanged
        })
    }
}

impl CacheInspector for StalenessCache {
    fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ..CacheStats::default()
        };
        for entry in self.entries.iter() {
            match entry.source.kind() {
                EntryKind::SingleFile => stats.single_files += 1,
                EntryKind::AlternateSource => stats.alternate_sources += 1,
                EntryKind::Bundle => stats.bundles += 1,
            }
        }
        stats
    }

    fn entries(&self) -> Vec<CachedUrlSummary> {
        let mut summaries: Vec<CachedUrlSummary> = self
            .entries
            .iter()
            .map(|entry| entry.value().summary(entry.key()))
            .collect();
        summaries.sort_by(|a, b| a.url.cmp(&b.url));
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterceptorConfig;
    use crate::fs::MemoryFileSystem;

    fn cache(fs: Arc<MemoryFileSystem>, production: bool) -> StalenessCache {
        let config = InterceptorConfig::new("/src");
        let probe = FileSystemProbe::new(fs);
        StalenessCache::new(
            PathClassifier::new(probe.clone(), &config),
            DirectoryBundler::new(probe.clone(), &config, None),
            probe,
            production,
        )
    }

    fn single(path: &str, secs: u64) -> SourceState {
        SourceState::SingleFile {
            path: PathBuf::from(path),
            mtime: MemoryFileSystem::time(secs),
        }
    }

    fn bundle(dir: &str, members: &[(&str, u64)]) -> SourceState {
        SourceState::Bundle {
            dir: PathBuf::from(dir),
            members: members
                .iter()
                .map(|(p, secs)| (PathBuf::from(p), MemoryFileSystem::time(*secs)))
                .collect(),
        }
    }

    #[test]
    fn test_absent_then_fresh() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app.js", "var a;", 10);
        let cache = cache(fs, false);

        assert_eq!(cache.check_and_get("/app.js"), CacheLookup::Absent);
        cache.commit("/app.js", single("/src/app.js", 10), Arc::from("var a;"));
        assert_eq!(
            cache.check_and_get("/app.js"),
            CacheLookup::Fresh(Arc::from("var a;"))
        );
    }

    #[test]
    fn test_single_file_mtime_change_is_stale() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app.js", "var a;", 10);
        let cache = cache(fs.clone(), false);
        cache.commit("/app.js", single("/src/app.js", 10), Arc::from("var a;"));

        fs.add_file("/src/app.js", "var b;", 11);
        assert_eq!(cache.check_and_get("/app.js"), CacheLookup::Stale);
    }

    #[test]
    fn test_deleted_source_is_stale() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app.js", "var a;", 10);
        let cache = cache(fs.clone(), false);
        cache.commit("/app.js", single("/src/app.js", 10), Arc::from("var a;"));

        fs.remove("/src/app.js");
        assert_eq!(cache.check_and_get("/app.js"), CacheLookup::Stale);
    }

    #[test]
    fn test_literal_file_shadowing_bundle_is_stale() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app/a.js", "var a;", 10);
        let cache = cache(fs.clone(), false);
        cache.commit(
            "/app.js",
            bundle("/src/app", &[("/src/app/a.js", 10)]),
            Arc::from("var a;;\n\n"),
        );
        assert!(matches!(cache.check_and_get("/app.js"), CacheLookup::Fresh(_)));

        fs.add_file("/src/app.js", "var literal;", 12);
        assert_eq!(cache.check_and_get("/app.js"), CacheLookup::Stale);
    }

    #[test]
    fn test_bundle_member_added_is_stale() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app/a.js", "var a;", 10);
        let cache = cache(fs.clone(), false);
        cache.commit(
            "/app.js",
            bundle("/src/app", &[("/src/app/a.js", 10)]),
            Arc::from("var a;;\n\n"),
        );

        fs.add_file("/src/app/b.js", "var b;", 1);
        assert_eq!(cache.check_and_get("/app.js"), CacheLookup::Stale);
    }

    #[test]
    fn test_bundle_member_removed_is_stale() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app/a.js", "var a;", 10);
        fs.add_file("/src/app/b.js", "var b;", 10);
        let cache = cache(fs.clone(), false);
        cache.commit(
            "/app.js",
            bundle("/src/app", &[("/src/app/a.js", 10), ("/src/app/b.js", 10)]),
            Arc::from("..."),
        );

        fs.remove("/src/app/b.js");
        assert_eq!(cache.check_and_get("/app.js"), CacheLookup::Stale);
    }

    #[test]
    fn test_bundle_member_touched_is_stale() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app/a.js", "var a;", 10);
        fs.add_file("/src/app/b.js", "var b;", 10);
        let cache = cache(fs.clone(), false);
        cache.commit(
            "/app.js",
            bundle("/src/app", &[("/src/app/a.js", 10), ("/src/app/b.js", 10)]),
            Arc::from("..."),
        );
        assert!(matches!(cache.check_and_get("/app.js"), CacheLookup::Fresh(_)));

        fs.add_file("/src/app/b.js", "var b;", 20);
        assert_eq!(cache.check_and_get("/app.js"), CacheLookup::Stale);
    }

    #[test]
    fn test_production_trusts_existing_entry() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app.js", "var a;", 10);
        let cache = cache(fs.clone(), true);
        cache.commit("/app.js", single("/src/app.js", 10), Arc::from("var a;"));

        fs.add_file("/src/app.js", "var changed;", 99);
        fs.remove("/src");
        assert_eq!(
            cache.check_and_get("/app.js"),
            CacheLookup::Fresh(Arc::from("var a;"))
        );
    }

    #[test]
    fn test_stats_and_entries() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app.js", "var a;", 10);
        fs.add_file("/src/lib/x.js", "var x;", 10);
        let cache = cache(fs, false);

        cache.check_and_get("/app.js");
        cache.commit("/app.js", single("/src/app.js", 10), Arc::from("var a;"));
        cache.commit(
            "/lib.js",
            bundle("/src/lib", &[("/src/lib/x.js", 10)]),
            Arc::from("var x;;\n\n"),
        );
        cache.check_and_get("/app.js");
        cache.check_and_get("/lib.js");

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.single_files, 1);
        assert_eq!(stats.bundles, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.stale, 0);

        let entries = cache.entries();
        assert_eq!(entries[0].url, "/app.js");
        assert_eq!(entries[1].url, "/lib.js");
        assert_eq!(entries[1].kind, EntryKind::Bundle);
        assert_eq!(entries[1].member_count, 1);
    }
}
