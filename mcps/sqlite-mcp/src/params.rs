//! Parameter types for SQLite MCP tools
//!
//! Each tool's input schema is generated from these structs, so the schema and
//! the deserialization of incoming arguments cannot drift apart.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Rows returned by `get_table_data` when no limit is given
pub const DEFAULT_TABLE_DATA_LIMIT: u32 = 100;

fn default_limit() -> u32 {
    DEFAULT_TABLE_DATA_LIMIT
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteQueryParams {
    #[schemars(description = "The SQL query to execute (SELECT only)")]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetTableSchemaParams {
    #[schemars(description = "The name of the table to get schema for")]
    pub table_name: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListTablesParams {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetTableDataParams {
    #[schemars(description = "The name of the table to get data from")]
    pub table_name: String,

    #[schemars(description = "Maximum number of rows to return (default: 100)")]
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct CreateSampleDataParams {}
