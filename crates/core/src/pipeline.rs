//! Turns a resolution into an artifact: read, compile, concatenate, minify.

use crate::bundle::DirectoryBundler;
use crate::cache::SourceState;
use crate::error::{GetSmartError, Result};
use crate::fs::FileSystemProbe;
use crate::resolve::Resolution;
use getsmart_api::Minifier;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// An artifact together with the source state it was built from
#[derive(Debug, Clone)]
pub struct Processed {
    pub source: SourceState,
    pub artifact: String,
}

pub struct Pipeline {
    probe: FileSystemProbe,
    bundler: DirectoryBundler,
    minifier: Option<Arc<dyn Minifier>>,
    compress: bool,
    minified_marker: String,
}

impl Pipeline {
    pub fn new(
        probe: FileSystemProbe,
        bundler: DirectoryBundler,
        minifier: Option<Arc<dyn Minifier>>,
        compress: bool,
        minified_marker: String,
    ) -> Self {
        Self {
            probe,
            bundler,
            minifier,
            compress,
            minified_marker,
        }
    }

    /// Build the artifact for `url`.
    ///
    /// `Ok(None)` means there is nothing to serve (no source, or a bundle
    /// directory that cannot be listed) and the request should pass through.
    pub fn process(&self, url: &str, resolution: &Resolution) -> Result<Option<Processed>> {
        let (source, assembled) = match resolution {
            Resolution::NotFound => return Ok(None),
            Resolution::SingleFile { path, mtime } => {
                let Some(content) = self.read_source(path)? else {
                    return Ok(None);
                };
                let source = SourceState::SingleFile {
                    path: path.clone(),
                    mtime: *mtime,
                };
                (source, content)
            }
            Resolution::AlternateSource { path, mtime } => {
                let Some(content) = self.read_source(path)? else {
                    return Ok(None);
                };
                let compiled = self
                    .bundler
                    .transform(path, content)
                    .map_err(|e| GetSmartError::transform(url, e))?;
                let source = SourceState::AlternateSource {
                    path: path.clone(),
                    mtime: *mtime,
                };
                (source, compiled)
            }
            Resolution::DirectoryCandidate { dir } => {
                let listed = match self.bundler.list_members(dir) {
                    Ok(members) => members,
                    Err(e) => {
                        warn!("Couldn't list bundle directory {:?}: {}", dir, e);
                        return Ok(None);
                    }
                };

                // Stat before reading: a write landing in between shows up as a
                // newer mtime on the next request instead of being lost
                let mut members = BTreeMap::new();
                let mut ordered = Vec::with_capacity(listed.len());
                for member in listed {
                    match self.probe.file_mtime(&member) {
                        Some(mtime) => {
                            members.insert(member.clone(), mtime);
                            ordered.push(member);
                        }
                        None => warn!("Bundle member {:?} vanished before reading", member),
                    }
                }

                let bundle = self
                    .bundler
                    .concat(&ordered)
                    .map_err(|e| GetSmartError::transform(url, e))?;
                debug!(
                    "Bundled {} of {} members for {}",
                    bundle.included.len(),
                    ordered.len(),
                    url
                );

                // Skipped members stay untracked so the next lookup sees a
                // different member set and rebuilds
                let members = bundle
                    .included
                    .iter()
                    .filter_map(|member| {
                        members
                            .get(member)
                            .map(|mtime| (member.clone(), *mtime))
                    })
                    .collect();
                let source = SourceState::Bundle {
                    dir: dir.clone(),
                    members,
                };
                (source, bundle.contents)
            }
        };

        let artifact = self.minify(url, assembled)?;
        Ok(Some(Processed { source, artifact }))
    }

    /// `Ok(None)` when the file disappeared after classification
    fn read_source(&self, path: &Path) -> Result<Option<String>> {
        match self.probe.read(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Source {:?} vanished before reading", path);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `url` gets minified under the current settings
    pub fn should_minify(&self, url: &str) -> bool {
        self.compress && !url.ends_with(self.minified_marker.as_str())
    }

    fn minify(&self, url: &str, assembled: String) -> Result<String> {
        if !self.should_minify(url) {
            return Ok(assembled);
        }
        let Some(minifier) = &self.minifier else {
            return Err(GetSmartError::Config(
                "compress is enabled but no minifier is registered".to_string(),
            ));
        };
        minifier
            .minify(&assembled)
            .map_err(|e| GetSmartError::transform(url, e))
    }
}
