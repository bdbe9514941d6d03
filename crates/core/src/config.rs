//! Interceptor configuration.
//!
//! Loaded from a JSON file and/or assembled by the CLI. `src` is the only
//! required option; setting `dest` switches the interceptor into persistence
//! mode, where every freshly built artifact is also written to disk.

use crate::error::{GetSmartError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable selecting production defaults
pub const ENV_VAR: &str = "GETSMART_ENV";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterceptorConfig {
    /// Root directory for source lookup
    pub src: PathBuf,
    /// Destination root for persistence mode
    #[serde(default)]
    pub dest: Option<PathBuf>,
    /// Trust existing cache entries without re-stating the filesystem
    #[serde(default = "production_from_env", alias = "isProduction")]
    pub is_production: bool,
    /// Run the minify step
    #[serde(default = "production_from_env")]
    pub compress: bool,
    #[serde(default = "default_script_extension")]
    pub script_extension: String,
    #[serde(default = "default_alternate_extension")]
    pub alternate_extension: Option<String>,
    /// Request paths ending with this marker are never minified
    #[serde(default = "default_minified_marker")]
    pub minified_marker: String,
}

/// `true` when `GETSMART_ENV=production`
pub fn production_from_env() -> bool {
    std::env::var(ENV_VAR)
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}

fn default_script_extension() -> String {
    "js".to_string()
}

fn default_alternate_extension() -> Option<String> {
    Some("coffee".to_string())
}

fn default_minified_marker() -> String {
    ".min.js".to_string()
}

impl InterceptorConfig {
    pub fn new(src: impl Into<PathBuf>) -> Self {
        let is_production = production_from_env();
        Self {
            src: src.into(),
            dest: None,
            is_production,
            compress: is_production,
            script_extension: default_script_extension(),
            alternate_extension: default_alternate_extension(),
            minified_marker: default_minified_marker(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_dest(mut self, dest: impl Into<PathBuf>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn production(mut self, enabled: bool) -> Self {
        self.is_production = enabled;
        self
    }

    pub fn compress(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    pub fn with_alternate_extension(mut self, ext: Option<&str>) -> Self {
        self.alternate_extension = ext.map(|e| e.trim_start_matches('.').to_string());
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.dest.is_some()
    }

    /// `.js`, with the leading dot
    pub fn script_suffix(&self) -> String {
        format!(".{}", self.script_extension)
    }

    pub fn validate(&self) -> Result<()> {
        if self.src.as_os_str().is_empty() {
            return Err(GetSmartError::Config(
                "GetSmart requires a \"src\" directory".to_string(),
            ));
        }
        if self.script_extension.is_empty() {
            return Err(GetSmartError::Config(
                "script_extension must not be empty".to_string(),
            ));
        }
        if let Some(alt) = &self.alternate_extension {
            if alt.is_empty() || *alt == self.script_extension {
                return Err(GetSmartError::Config(format!(
                    "alternate_extension {:?} must differ from script_extension",
                    alt
                )));
            }
        }
        if let Some(dest) = &self.dest {
            if dest.as_os_str().is_empty() {
                return Err(GetSmartError::Config(
                    "dest must not be empty when set".to_string(),
                ));
            }
        }
        Ok(())
    }
}
