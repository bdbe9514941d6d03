use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SCRIPT_CONTENT_TYPE: &str = "application/javascript";

/// Inbound request descriptor, independent of the host HTTP framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRequest {
    pub method: String,
    pub path: String,
}

impl ScriptRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    /// Request path with any `?query` (and `#fragment`) removed
    pub fn path_without_query(&self) -> &str {
        let end = self.path.find(['?', '#']).unwrap_or(self.path.len());
        &self.path[..end]
    }
}

/// A script body ready to be written to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Arc<str>,
}

impl ScriptResponse {
    pub fn ok(body: Arc<str>) -> Self {
        Self {
            status: 200,
            content_type: SCRIPT_CONTENT_TYPE,
            body,
        }
    }
}

/// Terminal action decided by the interceptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Emit the script
    Serve(ScriptResponse),
    /// Emit an empty 404 (persistence write failed)
    NotFound,
    /// Leave the response untouched and hand control to the next handler
    PassThrough,
}

impl Outcome {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Outcome::PassThrough)
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Outcome::Serve(resp) => Some(&*resp.body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_stripped() {
        let req = ScriptRequest::get("/app.js?v=12");
        assert_eq!(req.path_without_query(), "/app.js");

        let req = ScriptRequest::get("/app.js");
        assert_eq!(req.path_without_query(), "/app.js");
    }
}
