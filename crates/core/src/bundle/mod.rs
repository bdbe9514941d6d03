//! Directory bundles: every script under `src/<name>/` served as `<name>.js`.
//!
//! The member list is recomputed on every call and sorted by full path string,
//! so the bundle order never depends on how the filesystem enumerates entries.

use crate::config::InterceptorConfig;
use crate::fs::FileSystemProbe;
use getsmart_api::{Compiler, TransformError, TransformResult};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Appended after every member so files cannot run into each other
pub const MEMBER_SEPARATOR: &str = ";\n\n";

#[derive(Clone)]
pub struct DirectoryBundler {
    probe: FileSystemProbe,
    script_extension: String,
    alternate_extension: Option<String>,
    compiler: Option<Arc<dyn Compiler>>,
}

impl DirectoryBundler {
    pub fn new(
        probe: FileSystemProbe,
        config: &InterceptorConfig,
        compiler: Option<Arc<dyn Compiler>>,
    ) -> Self {
        Self {
            probe,
            script_extension: config.script_extension.clone(),
            alternate_extension: config.alternate_extension.clone(),
            compiler,
        }
    }

    /// All script and alternate-source files under `dir`, recursively, sorted.
    ///
    /// Fails only when `dir` itself cannot be listed; unreadable entries below
    /// it are logged and skipped.
    pub fn list_members(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let names = self.probe.list_dir(dir)?;
        let mut members = Vec::new();
        self.collect(dir, names, &mut members);
        members.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
        Ok(members)
    }

    fn collect(&self, dir: &Path, names: Vec<String>, members: &mut Vec<PathBuf>) {
        for name in names {
            if name.starts_with('.') {
                continue;
            }

            let path = dir.join(&name);
            let Some(stat) = self.probe.stat(&path) else {
                warn!("Couldn't find path while bundling: {:?}", path);
                continue;
            };

            if stat.is_dir {
                match self.probe.list_dir(&path) {
                    Ok(children) => self.collect(&path, children, members),
                    Err(e) => warn!("Couldn't list directory {:?}: {}", path, e),
                }
            } else if self.is_member(&path) {
                members.push(path);
            } else {
                debug!("Ignoring non-script file {:?}", path);
            }
        }
    }

    fn is_member(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        ext == self.script_extension || self.alternate_extension.as_deref() == Some(ext)
    }

    fn is_alternate(&self, path: &Path) -> bool {
        match (&self.alternate_extension, path.extension().and_then(|e| e.to_str())) {
            (Some(alt), Some(ext)) => alt == ext,
            _ => false,
        }
    }

    /// Compile `content` if `path` is an alternate source, otherwise return it as is
    pub fn transform(&self, path: &Path, content: String) -> TransformResult<String> {
        if !self.is_alternate(path) {
            return Ok(content);
        }

        let Some(compiler) = &self.compiler else {
            return Err(TransformError::Compile(format!(
                "no compiler registered for {:?}",
                path
            )));
        };

        compiler.compile(&content).inspect_err(|e| {
            error!("{} failed on {:?}: {}", compiler.name(), path, e);
        })
    }

    /// Read one member and transform it.
    ///
    /// `Ok(None)` means the member vanished or became unreadable after listing.
    pub fn read_and_transform(&self, path: &Path) -> TransformResult<Option<String>> {
        let content = match self.probe.read(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping unreadable bundle member {:?}: {}", path, e);
                return Ok(None);
            }
        };
        self.transform(path, content).map(Some)
    }

    /// Concatenate members in order, each followed by [`MEMBER_SEPARATOR`].
    ///
    /// Members that could not be read are left out of both the contents and
    /// [`Concatenated::included`].
    pub fn concat(&self, members: &[PathBuf]) -> TransformResult<Concatenated> {
        let mut bundle = Concatenated::default();
        for member in members {
            if let Some(content) = self.read_and_transform(member)? {
                bundle.contents.push_str(&content);
                bundle.contents.push_str(MEMBER_SEPARATOR);
                bundle.included.push(member.clone());
            }
        }
        Ok(bundle)
    }
}

/// Output of [`DirectoryBundler::concat`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Concatenated {
    pub contents: String,
    pub included: Vec<PathBuf>,
}
