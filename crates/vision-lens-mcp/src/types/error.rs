//! Error types and JSON-RPC error codes for the MCP server.
//!
//! [`McpError`] only covers protocol-level failures. Failures while analysing
//! an image are [`vision_lens::VisionError`]s and are reported as tool results
//! with `isError: true`; there is intentionally no conversion between the two.

use serde_json::{json, Value};

use super::message::{JsonRpcError, RequestId};
use crate::config::API_KEY_ENV;

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Server-defined error codes.
pub mod mcp_error_codes {
    /// The provider credential is not configured.
    pub const MISSING_API_KEY: i32 = -32001;
}

/// All protocol errors that can occur in the MCP server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Missing API key: set {} to enable image analysis", API_KEY_ENV)]
    MissingApiKey,

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::MissingApiKey => MISSING_API_KEY,
            McpError::InternalError(_) | McpError::Io(_) | McpError::Json(_) => INTERNAL_ERROR,
        }
    }

    /// Expected failures the caller can act on; these carry no `data`.
    pub fn is_classified(&self) -> bool {
        !matches!(
            self,
            McpError::InternalError(_) | McpError::Io(_) | McpError::Json(_)
        )
    }

    /// Diagnostic context for unclassified errors.
    pub fn data(&self) -> Option<Value> {
        if self.is_classified() {
            return None;
        }

        let mut causes = Vec::new();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            causes.push(err.to_string());
            source = err.source();
        }

        Some(json!({
            "detail": format!("{self:?}"),
            "causes": causes,
        }))
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError::new(id, self.code(), self.to_string(), self.data())
    }
}

pub type McpResult<T> = Result<T, McpError>;
