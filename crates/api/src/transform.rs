use crate::error::TransformResult;

/// Compiles a higher-level source language (e.g. CoffeeScript) to JavaScript.
pub trait Compiler: Send + Sync {
    /// File extension (without the dot) this compiler accepts
    fn extension(&self) -> &str;

    fn compile(&self, source: &str) -> TransformResult<String>;

    /// Compiler name (for logging/debugging)
    fn name(&self) -> &str;
}

/// Shrinks JavaScript source. Must be deterministic.
pub trait Minifier: Send + Sync {
    fn minify(&self, source: &str) -> TransformResult<String>;

    /// Minifier name (for logging/debugging)
    fn name(&self) -> &str;
}
