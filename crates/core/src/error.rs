use getsmart_api::TransformError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GetSmartError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Transform error for {url}: {source}")]
    Transform {
        url: String,
        #[source]
        source: TransformError,
    },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GetSmartError {
    pub fn transform(url: impl Into<String>, source: TransformError) -> Self {
        GetSmartError::Transform {
            url: url.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GetSmartError>;
