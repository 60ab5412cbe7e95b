//! Type definitions for SQLite MCP

use serde::Serialize;
use serde_json::{Map, Value};

/// One result row: column name to value, in the column order of the statement
pub type Row = Map<String, Value>;

// ============================================================================
// Schema Types
// ============================================================================

/// Table definition as reported by `sqlite_master` and `pragma_table_info`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub name: String,
    /// The CREATE TABLE statement, for documentation
    pub sql: Option<String>,
    pub columns: Vec<ColumnInfo>,
}

/// Column schema info
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub not_null: bool,
    /// Default expression as written in the table definition
    pub default_value: Option<String>,
    pub primary_key: bool,
}

// ============================================================================
// Response Types
// ============================================================================

/// Rows actually inserted by one sample-data run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub users_inserted: usize,
    pub products_inserted: usize,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.users_inserted + self.products_inserted
    }
}

/// Body of a `resources/read` content entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceText {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}
