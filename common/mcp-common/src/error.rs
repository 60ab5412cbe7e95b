//! Error handling utilities for MCP servers
//!
//! Constructors for the JSON-RPC error payloads a server sends back, plus a
//! conversion trait so server-specific error enums can pick their own code.

use rmcp::model::ErrorCode;
use rmcp::ErrorData as McpError;
use serde_json::Value;

/// Type alias for handler results
pub type McpResult<T> = Result<T, McpError>;

/// Trait for converting errors into MCP-compatible errors
///
/// Server error types implement this to choose the JSON-RPC code and attach
/// structured `data` (for example a stable reason code).
///
/// ```rust,ignore
/// impl IntoMcpError for MyError {
///     fn into_mcp_error(self) -> McpError {
///         mcp_common::invalid_params(self.to_string())
///     }
/// }
/// ```
pub trait IntoMcpError {
    fn into_mcp_error(self) -> McpError;
}

impl IntoMcpError for std::io::Error {
    fn into_mcp_error(self) -> McpError {
        internal_error(format!("IO error: {}", self))
    }
}

impl IntoMcpError for serde_json::Error {
    fn into_mcp_error(self) -> McpError {
        internal_error(format!("JSON error: {}", self))
    }
}

impl IntoMcpError for McpError {
    fn into_mcp_error(self) -> McpError {
        self
    }
}

/// Extension trait for Result types to convert to MCP errors
pub trait ResultExt<T> {
    fn to_mcp_err(self) -> Result<T, McpError>;
}

impl<T, E: IntoMcpError> ResultExt<T> for Result<T, E> {
    fn to_mcp_err(self) -> Result<T, McpError> {
        self.map_err(IntoMcpError::into_mcp_error)
    }
}

/// -32700: the line was not valid JSON
pub fn parse_error(message: impl Into<String>) -> McpError {
    McpError::new(ErrorCode::PARSE_ERROR, message.into(), None)
}

/// -32600: valid JSON but not an acceptable request
pub fn invalid_request(message: impl Into<String>) -> McpError {
    McpError::new(ErrorCode::INVALID_REQUEST, message.into(), None)
}

/// -32601: no handler for the method
pub fn method_not_found(method: &str) -> McpError {
    McpError::new(
        ErrorCode::METHOD_NOT_FOUND,
        format!("Method not found: {}", method),
        None,
    )
}

/// -32602: the request params failed validation
pub fn invalid_params(message: impl Into<String>) -> McpError {
    McpError::new(ErrorCode::INVALID_PARAMS, message.into(), None)
}

/// -32002: the addressed resource does not exist
pub fn resource_not_found(message: impl Into<String>) -> McpError {
    McpError::new(ErrorCode::RESOURCE_NOT_FOUND, message.into(), None)
}

/// -32603: anything the server failed to do on its own side
pub fn internal_error(message: impl Into<String>) -> McpError {
    McpError::new(ErrorCode::INTERNAL_ERROR, message.into(), None)
}

/// Attach structured data to an error payload
pub fn with_data(mut error: McpError, data: Value) -> McpError {
    error.data = Some(data);
    error
}
