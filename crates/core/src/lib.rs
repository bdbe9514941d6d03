pub mod bundle;
pub mod cache;
pub mod config;
pub mod error;
pub mod fs;
pub mod interceptor;
pub mod logging;
pub mod pipeline;
pub mod resolve;

pub use cache::{CacheLookup, StalenessCache};
pub use config::InterceptorConfig;
pub use error::{GetSmartError, Result};
pub use interceptor::{ScriptInterceptor, ScriptInterceptorBuilder};
pub use resolve::{PathClassifier, Resolution};
