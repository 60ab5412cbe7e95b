//! SQLite MCP Library
//!
//! Exposes a single SQLite database over MCP: the schema and table contents as
//! resources, and five tools for read-only queries, schema lookups, paging and
//! seeding demonstration data. Client SQL passes through a lexical guard and
//! runs on a read-only connection.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use mcp_common::{serve_stdio, shutdown_signal};
//! use sqlite_mcp::{Router, Store};
//!
//! let store = Store::open("database.db")?;
//! serve_stdio(Router::new(store), shutdown_signal()).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod guard;
pub mod params;
pub mod router;
pub mod store;
pub mod types;

// Re-export main types
pub use config::ServerConfig;
pub use error::{ErrorKind, ServerError, StoreError};
pub use router::Router;
pub use store::Store;

// Re-export parameter types for direct API usage
pub use params::{ExecuteQueryParams, GetTableDataParams, GetTableSchemaParams};
