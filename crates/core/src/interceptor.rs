//! Request entry point.
//!
//! Per request: filter → cache check → (classify → process → commit) → emit.
//! Everything runs synchronously; hosts with an async runtime should call
//! [`ScriptInterceptor::handle`] from a blocking worker.

use crate::bundle::DirectoryBundler;
use crate::cache::{CacheLookup, Inflight, StalenessCache};
use crate::config::InterceptorConfig;
use crate::error::{GetSmartError, Result};
use crate::fs::{FileSystemProbe, OsFileSystem};
use crate::pipeline::Pipeline;
use crate::resolve::{PathClassifier, Resolution};
use getsmart_api::{
    Compiler, FileSystem, Minifier, Outcome, ScriptRequest, ScriptResponse, join_request_path,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared result of one build, handed to every coalesced caller
#[derive(Debug, Clone)]
enum Build {
    Artifact {
        artifact: Arc<str>,
        persist_failed: bool,
    },
    Unresolved,
}

pub struct ScriptInterceptorBuilder {
    config: InterceptorConfig,
    fs: Option<Arc<dyn FileSystem>>,
    compiler: Option<Arc<dyn Compiler>>,
    minifier: Option<Arc<dyn Minifier>>,
}

impl ScriptInterceptorBuilder {
    pub fn new(config: InterceptorConfig) -> Self {
        Self {
            config,
            fs: None,
            compiler: None,
            minifier: None,
        }
    }

    /// Defaults to the OS filesystem
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn Compiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn with_minifier(mut self, minifier: Arc<dyn Minifier>) -> Self {
        self.minifier = Some(minifier);
        self
    }

    pub fn build(self) -> Result<ScriptInterceptor> {
        self.config.validate()?;

        if self.config.compress && self.minifier.is_none() {
            return Err(GetSmartError::Config(
                "compress is enabled but no minifier is registered".to_string(),
            ));
        }
        if let (Some(alt), Some(compiler)) = (&self.config.alternate_extension, &self.compiler) {
            if compiler.extension() != alt {
                warn!(
                    "Compiler {} handles .{} but alternate sources use .{}",
                    compiler.name(),
                    compiler.extension(),
                    alt
                );
            }
        }

        let fs = self.fs.unwrap_or_else(|| Arc::new(OsFileSystem::new()));
        let probe = FileSystemProbe::new(fs);
        let classifier = PathClassifier::new(probe.clone(), &self.config);
        let bundler = DirectoryBundler::new(probe.clone(), &self.config, self.compiler);
        let cache = StalenessCache::new(
            classifier.clone(),
            bundler.clone(),
            probe.clone(),
            self.config.is_production,
        );
        let pipeline = Pipeline::new(
            probe.clone(),
            bundler,
            self.minifier,
            self.config.compress,
            self.config.minified_marker.clone(),
        );

        if self.config.is_production {
            info!(
                "Production mode: cached scripts are never revalidated; restart to pick up changes"
            );
        }

        Ok(ScriptInterceptor {
            script_suffix: self.config.script_suffix(),
            config: self.config,
            probe,
            classifier,
            cache: Arc::new(cache),
            pipeline,
            inflight: Inflight::new(),
        })
    }
}

pub struct ScriptInterceptor {
    config: InterceptorConfig,
    script_suffix: String,
    probe: FileSystemProbe,
    classifier: PathClassifier,
    cache: Arc<StalenessCache>,
    pipeline: Pipeline,
    inflight: Inflight<Build>,
}

impl ScriptInterceptor {
    pub fn builder(config: InterceptorConfig) -> ScriptInterceptorBuilder {
        ScriptInterceptorBuilder::new(config)
    }

    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    pub fn cache(&self) -> Arc<StalenessCache> {
        self.cache.clone()
    }

    /// Only `GET` requests for `*.js` without `..` segments are ours
    pub fn accepts(&self, method: &str, path: &str) -> bool {
        method.eq_ignore_ascii_case("GET")
            && path.ends_with(self.script_suffix.as_str())
            && !path.split('/').any(|segment| segment == "..")
    }

    /// Resolve one request to its terminal action.
    ///
    /// Compile and minify failures come back as `Err`; the host turns those
    /// into a server error.
    pub fn handle(&self, request: &ScriptRequest) -> Result<Outcome> {
        let url = request.path_without_query();
        if !self.accepts(&request.method, url) {
            return Ok(Outcome::PassThrough);
        }

        match self.cache.check_and_get(url) {
            CacheLookup::Fresh(artifact) => {
                debug!("Serving cached {}", url);
                return Ok(Outcome::Serve(ScriptResponse::ok(artifact)));
            }
            CacheLookup::Stale | CacheLookup::Absent => {}
        }

        match self.inflight.run(url, || self.build(url))? {
            Build::Unresolved => Ok(Outcome::PassThrough),
            Build::Artifact {
                persist_failed: true,
                ..
            } => Ok(Outcome::NotFound),
            Build::Artifact { artifact, .. } => Ok(Outcome::Serve(ScriptResponse::ok(artifact))),
        }
    }

    fn build(&self, url: &str) -> Result<Build> {
        let resolution = self.classifier.classify(url);
        if resolution == Resolution::NotFound {
            debug!("GetSmart: no file or directory for {}", url);
            return Ok(Build::Unresolved);
        }

        let Some(processed) = self.pipeline.process(url, &resolution)? else {
            return Ok(Build::Unresolved);
        };

        let artifact: Arc<str> = Arc::from(processed.artifact);
        self.cache.commit(url, processed.source, artifact.clone());

        let persist_failed = match &self.config.dest {
            Some(dest) => {
                let target = join_request_path(dest, url);
                match self.probe.write_creating_dirs(&target, &artifact) {
                    Ok(()) => {
                        debug!("Persisted {} to {:?}", url, target);
                        false
                    }
                    Err(e) => {
                        warn!("Couldn't persist {} to {:?}: {}", url, target, e);
                        true
                    }
                }
            }
            None => false,
        };

        Ok(Build::Artifact {
            artifact,
            persist_failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use getsmart_api::{CacheInspector, TransformResult};

    struct NoopMinifier;

    impl Minifier for NoopMinifier {
        fn minify(&self, source: &str) -> TransformResult<String> {
            Ok(source.to_string())
        }

        fn name(&self) -> &str {
            "noop"
        }
    }

    fn interceptor(fs: Arc<MemoryFileSystem>) -> ScriptInterceptor {
        let config = InterceptorConfig::new("/src").production(false).compress(false);
        ScriptInterceptor::builder(config)
            .with_file_system(fs)
            .build()
            .unwrap()
    }

    #[test]
    fn test_accepts() {
        let fs = Arc::new(MemoryFileSystem::new());
        let interceptor = interceptor(fs);

        assert!(interceptor.accepts("GET", "/app.js"));
        assert!(!interceptor.accepts("POST", "/app.js"));
        assert!(!interceptor.accepts("GET", "/app.css"));
        assert!(!interceptor.accepts("GET", "/../etc/passwd.js"));
        assert!(interceptor.accepts("GET", "/lib/..x.js"));
    }

    #[test]
    fn test_pass_through_does_not_touch_cache() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app.js", "var a;", 1);
        let interceptor = interceptor(fs.clone());

        let outcome = interceptor
            .handle(&ScriptRequest::new("POST", "/app.js"))
            .unwrap();
        assert_eq!(outcome, Outcome::PassThrough);
        let outcome = interceptor.handle(&ScriptRequest::get("/app.css")).unwrap();
        assert_eq!(outcome, Outcome::PassThrough);

        let stats = interceptor.cache().stats();
        assert_eq!(stats.misses + stats.hits + stats.stale, 0);
        assert_eq!(fs.total_reads(), 0);
    }

    #[test]
    fn test_unresolvable_passes_through() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_dir("/src");
        let interceptor = interceptor(fs);

        let outcome = interceptor.handle(&ScriptRequest::get("/missing.js")).unwrap();
        assert_eq!(outcome, Outcome::PassThrough);
        assert!(interceptor.cache().is_empty());
    }

    #[test]
    fn test_query_string_is_ignored() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app.js", "var a;", 1);
        let interceptor = interceptor(fs);

        let outcome = interceptor
            .handle(&ScriptRequest::get("/app.js?v=3"))
            .unwrap();
        assert_eq!(outcome.body(), Some("var a;"));
        assert!(interceptor.cache().get("/app.js").is_some());
    }

    #[test]
    fn test_compress_requires_minifier() {
        let config = InterceptorConfig::new("/src").compress(true);
        let result = ScriptInterceptor::builder(config)
            .with_file_system(Arc::new(MemoryFileSystem::new()))
            .build();
        assert!(matches!(result, Err(GetSmartError::Config(_))));

        let config = InterceptorConfig::new("/src").compress(true);
        let result = ScriptInterceptor::builder(config)
            .with_file_system(Arc::new(MemoryFileSystem::new()))
            .with_minifier(Arc::new(NoopMinifier))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_persist_failure_is_not_found_but_cached() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app.js", "var a;", 1);
        fs.set_read_only(true);
        let config = InterceptorConfig::new("/src")
            .production(false)
            .compress(false)
            .with_dest("/public");
        let interceptor = ScriptInterceptor::builder(config)
            .with_file_system(fs)
            .build()
            .unwrap();

        let outcome = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(outcome, Outcome::NotFound);

        // The in-memory path still has the artifact
        let outcome = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(outcome.body(), Some("var a;"));
    }

    #[test]
    fn test_persist_writes_mirrored_path() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/lib/app/a.js", "var a=1;", 1);
        let config = InterceptorConfig::new("/src")
            .production(false)
            .compress(false)
            .with_dest("/public/js");
        let interceptor = ScriptInterceptor::builder(config)
            .with_file_system(fs.clone())
            .build()
            .unwrap();

        let outcome = interceptor.handle(&ScriptRequest::get("/lib/app.js")).unwrap();
        assert_eq!(outcome.body(), Some("var a=1;;\n\n"));
        assert_eq!(
            fs.contents(std::path::Path::new("/public/js/lib/app.js"))
                .as_deref(),
            Some("var a=1;;\n\n")
        );
    }

    #[test]
    fn test_bundle_scenario() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app/b.js", "var b=2;", 1);
        fs.add_file("/src/app/a.js", "var a=1;", 1);
        let interceptor = interceptor(fs.clone());

        let first = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(first.body(), Some("var a=1;;\n\nvar b=2;;\n\n"));
        assert_eq!(fs.read_count("/src/app/b.js"), 1);

        let second = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(second, first);
        assert_eq!(fs.read_count("/src/app/b.js"), 1);

        fs.add_file("/src/app/b.js", "var b=3;", 2);
        let third = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(third.body(), Some("var a=1;;\n\nvar b=3;;\n\n"));
        assert_eq!(fs.read_count("/src/app/b.js"), 2);
    }

    #[test]
    fn test_unchanged_file_is_not_reread() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app.js", "var a=1;", 1);
        let interceptor = interceptor(fs.clone());

        let first = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        let second = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs.read_count("/src/app.js"), 1);

        let stats = interceptor.cache().stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_modified_file_is_rebuilt() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app.js", "var a=1;", 1);
        let interceptor = interceptor(fs.clone());
        interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();

        fs.add_file("/src/app.js", "var a=2;", 2);
        let outcome = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(outcome.body(), Some("var a=2;"));
        assert_eq!(interceptor.cache().stats().stale, 1);
    }

    #[test]
    fn test_added_member_invalidates_bundle() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app/a.js", "var a=1;", 1);
        let interceptor = interceptor(fs.clone());
        interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();

        fs.add_file("/src/app/c.js", "var c=3;", 1);
        let outcome = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(outcome.body(), Some("var a=1;;\n\nvar c=3;;\n\n"));
    }

    #[test]
    fn test_member_skipped_while_unreadable_is_picked_up_later() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app/a.js", "var a=1;", 1);
        fs.add_file("/src/app/b.js", "var b=2;", 1);
        fs.make_unreadable("/src/app/a.js");
        let interceptor = interceptor(fs.clone());

        let first = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(first.body(), Some("var b=2;;\n\n"));

        fs.make_readable("/src/app/a.js");
        let second = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(second.body(), Some("var a=1;;\n\nvar b=2;;\n\n"));

        // Complete now, so the next lookup is a hit
        interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(fs.read_count("/src/app/a.js"), 1);
    }

    #[test]
    fn test_removed_source_passes_through() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app.js", "var a=1;", 1);
        let interceptor = interceptor(fs.clone());
        interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();

        fs.remove("/src/app.js");
        let outcome = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(outcome, Outcome::PassThrough);
    }

    #[test]
    fn test_minified_marker_served_raw() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/lib.min.js", "var a = 1;", 1);
        fs.add_file("/src/app.js", "var a = 1;", 1);
        let config = InterceptorConfig::new("/src").production(false).compress(true);
        let interceptor = ScriptInterceptor::builder(config)
            .with_file_system(fs)
            .with_minifier(Arc::new(NoopMinifier))
            .build()
            .unwrap();

        let outcome = interceptor.handle(&ScriptRequest::get("/lib.min.js")).unwrap();
        assert_eq!(outcome.body(), Some("var a = 1;"));
    }

    #[test]
    fn test_production_trusts_cached_entry() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/src/app.js", "var a=1;", 1);
        let config = InterceptorConfig::new("/src").production(true).compress(false);
        let interceptor = ScriptInterceptor::builder(config)
            .with_file_system(fs.clone())
            .build()
            .unwrap();
        interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();

        fs.add_file("/src/app.js", "var a=2;", 2);
        let outcome = interceptor.handle(&ScriptRequest::get("/app.js")).unwrap();
        assert_eq!(outcome.body(), Some("var a=1;"));
        assert_eq!(fs.read_count("/src/app.js"), 1);
    }

    #[test]
    fn test_traversal_passes_through() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/secret.js", "var key=1;", 1);
        fs.add_dir("/src");
        let interceptor = interceptor(fs.clone());

        let outcome = interceptor
            .handle(&ScriptRequest::get("/../secret.js"))
            .unwrap();
        assert_eq!(outcome, Outcome::PassThrough);
        assert_eq!(fs.total_reads(), 0);
    }
}
