#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("Compile error: {0}")]
    Compile(String),
    #[error("Minify error: {0}")]
    Minify(String),
    #[error("Unsupported source: {0}")]
    Unsupported(String),
}

pub type TransformResult<T> = std::result::Result<T, TransformError>;
