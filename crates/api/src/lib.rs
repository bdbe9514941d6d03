pub mod cache;
pub mod error;
pub mod fs;
pub mod http;
pub mod transform;

// Re-export commonly used types
pub use cache::{CacheInspector, CacheStats, CachedUrlSummary, EntryKind};
pub use error::{TransformError, TransformResult};
pub use fs::{FileStat, FileSystem, join_request_path};
pub use http::{Outcome, SCRIPT_CONTENT_TYPE, ScriptRequest, ScriptResponse};
pub use transform::{Compiler, Minifier};
