pub mod minify;

use getsmart_api::{Minifier, TransformError, TransformResult};
use tracing::trace;

pub use minify::minify_js;

/// Pure-Rust JavaScript minifier: strips comments and collapses whitespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsMinifier;

impl JsMinifier {
    pub fn new() -> Self {
        Self
    }
}

impl Minifier for JsMinifier {
    fn minify(&self, source: &str) -> TransformResult<String> {
        let minified = minify_js(source).map_err(TransformError::Minify)?;
        trace!("Minified {} -> {} bytes", source.len(), minified.len());
        Ok(minified)
    }

    fn name(&self) -> &str {
        "getsmart-js"
    }
}
