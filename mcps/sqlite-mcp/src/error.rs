//! Error types for SQLite MCP
//!
//! [`StoreError`] is what the store adapter returns. [`ServerError`] is the
//! router's taxonomy; every variant falls into one [`ErrorKind`] and converts
//! into a JSON-RPC error payload at the router boundary.

use mcp_common::{
    internal_error, invalid_params, method_not_found, resource_not_found, with_data,
    IntoMcpError, McpError,
};
use serde_json::json;
use thiserror::Error;

use crate::guard::{InvalidIdentifier, Rejection};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Query rejected: {0}")]
    Rejected(Rejection),

    #[error("Invalid table name: {0:?}")]
    InvalidIdentifier(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<InvalidIdentifier> for StoreError {
    fn from(err: InvalidIdentifier) -> Self {
        StoreError::InvalidIdentifier(err.0)
    }
}

/// Coarse classification reported to the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is wrong: bad arguments, unknown names, unsafe SQL
    Validation,
    /// The database could not be reached or failed
    Storage,
    /// The addressed table or resource does not exist
    NotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Storage => "storage",
            ErrorKind::NotFound => "not_found",
        }
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing required argument '{argument}' for tool {tool}")]
    MissingArgument { tool: String, argument: String },

    #[error("Invalid arguments for tool {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Unknown resource URI: {0}")]
    UnknownResource(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::UnknownMethod(_)
            | ServerError::UnknownTool(_)
            | ServerError::MissingArgument { .. }
            | ServerError::InvalidArguments { .. }
            | ServerError::InvalidParams(_) => ErrorKind::Validation,
            ServerError::UnknownResource(_) => ErrorKind::NotFound,
            ServerError::Store(StoreError::Rejected(_))
            | ServerError::Store(StoreError::InvalidIdentifier(_)) => ErrorKind::Validation,
            ServerError::Store(StoreError::TableNotFound(_)) => ErrorKind::NotFound,
            ServerError::Store(StoreError::Sqlite(_)) | ServerError::Serialization(_) => {
                ErrorKind::Storage
            }
        }
    }

    /// Stable reason code for errors a client may want to branch on
    pub fn reason_code(&self) -> Option<String> {
        match self {
            ServerError::UnknownMethod(_) => Some("unknown-method".to_string()),
            ServerError::UnknownTool(_) => Some("unknown-tool".to_string()),
            ServerError::MissingArgument { argument, .. } => {
                Some(format!("missing-argument:{}", argument))
            }
            ServerError::InvalidArguments { .. } => Some("invalid-arguments".to_string()),
            ServerError::UnknownResource(_) => Some("unknown-resource".to_string()),
            ServerError::Store(StoreError::Rejected(rejection)) => Some(rejection.reason_code()),
            ServerError::Store(StoreError::InvalidIdentifier(_)) => {
                Some("invalid-identifier".to_string())
            }
            ServerError::Store(StoreError::TableNotFound(_)) => Some("table-not-found".to_string()),
            ServerError::InvalidParams(_)
            | ServerError::Store(StoreError::Sqlite(_))
            | ServerError::Serialization(_) => None,
        }
    }
}

impl IntoMcpError for ServerError {
    fn into_mcp_error(self) -> McpError {
        let kind = self.kind();
        let reason = self.reason_code();
        let message = self.to_string();

        let error = match (&self, kind) {
            (ServerError::UnknownMethod(method), _) => method_not_found(method),
            (_, ErrorKind::Validation) => invalid_params(message),
            (_, ErrorKind::NotFound) => resource_not_found(message),
            (_, ErrorKind::Storage) => internal_error(message),
        };

        let mut data = json!({ "kind": kind.as_str() });
        if let Some(reason) = reason {
            data["reason"] = json!(reason);
        }
        with_data(error, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn test_rejection_maps_to_validation_with_reason() {
        let err = ServerError::from(StoreError::Rejected(Rejection::ForbiddenPattern("DROP")));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mcp = err.into_mcp_error();
        assert_eq!(mcp.code, ErrorCode::INVALID_PARAMS);
        assert!(mcp.message.contains("DROP"));
        let data = mcp.data.unwrap();
        assert_eq!(data["kind"], "validation");
        assert_eq!(data["reason"], "forbidden-pattern:DROP");
    }

    #[test]
    fn test_unknown_method_code() {
        let mcp = ServerError::UnknownMethod("x/y".to_string()).into_mcp_error();
        assert_eq!(mcp.code, ErrorCode::METHOD_NOT_FOUND);
        assert_eq!(mcp.data.unwrap()["reason"], "unknown-method");
    }

    #[test]
    fn test_not_found_code() {
        let mcp = ServerError::from(StoreError::TableNotFound("ghosts".to_string())).into_mcp_error();
        assert_eq!(mcp.code, ErrorCode::RESOURCE_NOT_FOUND);
        assert_eq!(mcp.data.unwrap()["kind"], "not_found");
    }

    #[test]
    fn test_storage_error_has_no_reason() {
        let sqlite = rusqlite::Error::InvalidQuery;
        let mcp = ServerError::from(StoreError::from(sqlite)).into_mcp_error();
        assert_eq!(mcp.code, ErrorCode::INTERNAL_ERROR);
        let data = mcp.data.unwrap();
        assert_eq!(data["kind"], "storage");
        assert!(data.get("reason").is_none());
    }

    #[test]
    fn test_missing_argument_reason() {
        let err = ServerError::MissingArgument {
            tool: "execute_query".to_string(),
            argument: "query".to_string(),
        };
        assert_eq!(err.reason_code().as_deref(), Some("missing-argument:query"));
        assert!(err.to_string().contains("'query'"));
    }
}
