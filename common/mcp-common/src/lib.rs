//! MCP Common - Shared plumbing for stdio MCP servers
//!
//! - **Protocol**: JSON-RPC 2.0 envelope types ([`JsonRpcRequest`], [`JsonRpcResponse`])
//! - **Session**: the line-delimited message loop and `initialize` handshake,
//!   delegating everything else to a [`RequestHandler`]
//! - **Errors**: constructors for JSON-RPC error payloads and [`IntoMcpError`]
//! - **Results**: helpers for building `CallToolResult` responses
//! - **Initialization**: stderr tracing setup
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{serve_stdio, shutdown_signal, RequestHandler};
//!
//! struct MyServer;
//! impl RequestHandler for MyServer { /* ... */ }
//!
//! mcp_common::init_tracing("my_mcp", LogFormat::Text)?;
//! serve_stdio(MyServer, shutdown_signal()).await?;
//! ```

pub mod error;
pub mod init;
pub mod protocol;
pub mod result;
pub mod session;

// Re-export commonly used items at crate root
pub use error::{
    internal_error, invalid_params, invalid_request, method_not_found, parse_error,
    resource_not_found, with_data, IntoMcpError, McpResult, ResultExt,
};
pub use init::{init_tracing, LogFormat};
pub use protocol::{JsonRpcRequest, JsonRpcResponse, RequestId};
pub use result::{json_success, text_success, to_result_value};
pub use session::{
    serve_stdio, shutdown_signal, RequestHandler, Session, SessionState, SessionStats,
};

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo, Tool},
    ErrorData as McpError,
};
