//! Capability catalog - the tools and resources this server offers
//!
//! Tools are a fixed set. Resources are derived from the database on every
//! listing: the schema document plus one document per table.

use std::fmt;
use std::sync::Arc;

use rmcp::model::{AnnotateAble, JsonObject, RawResource, Resource, Tool};
use schemars::JsonSchema;
use serde_json::Value;

use crate::params::*;
use crate::store::Store;

/// URI of the whole-schema resource
pub const SCHEMA_URI: &str = "sqlite://schema";

/// Prefix of per-table resource URIs; the table name follows
pub const TABLE_URI_PREFIX: &str = "sqlite://table/";

pub const RESOURCE_MIME_TYPE: &str = "application/json";

// ============================================================================
// Tools
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ExecuteQuery,
    GetTableSchema,
    ListTables,
    GetTableData,
    CreateSampleData,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::ExecuteQuery,
        ToolName::GetTableSchema,
        ToolName::ListTables,
        ToolName::GetTableData,
        ToolName::CreateSampleData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ExecuteQuery => "execute_query",
            ToolName::GetTableSchema => "get_table_schema",
            ToolName::ListTables => "list_tables",
            ToolName::GetTableData => "get_table_data",
            ToolName::CreateSampleData => "create_sample_data",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolName::ExecuteQuery => "Execute a read-only SQL query on the database",
            ToolName::GetTableSchema => "Get the schema for a specific table",
            ToolName::ListTables => "List all tables in the database",
            ToolName::GetTableData => "Get data from a specific table with optional limit",
            ToolName::CreateSampleData => "Create sample data for demonstration purposes",
        }
    }

    pub fn input_schema(&self) -> Arc<JsonObject> {
        match self {
            ToolName::ExecuteQuery => schema_for::<ExecuteQueryParams>(),
            ToolName::GetTableSchema => schema_for::<GetTableSchemaParams>(),
            ToolName::ListTables => schema_for::<ListTablesParams>(),
            ToolName::GetTableData => schema_for::<GetTableDataParams>(),
            ToolName::CreateSampleData => schema_for::<CreateSampleDataParams>(),
        }
    }

    /// Parameter names listed as `required` in the input schema
    pub fn required_arguments(&self) -> Vec<String> {
        self.input_schema()
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn to_tool(&self) -> Tool {
        Tool::new(self.as_str(), self.description(), self.input_schema())
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn schema_for<T: JsonSchema>() -> Arc<JsonObject> {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(schema) {
        Ok(Value::Object(mut object)) => {
            // Generator metadata, not part of the input contract.
            object.remove("$schema");
            object.remove("title");
            Arc::new(object)
        }
        _ => Arc::new(JsonObject::new()),
    }
}

/// The fixed tool list
pub fn tools() -> Vec<Tool> {
    ToolName::ALL.iter().map(ToolName::to_tool).collect()
}

// ============================================================================
// Resources
// ============================================================================

/// A parsed resource URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUri {
    Schema,
    Table(String),
}

impl ResourceUri {
    /// Returns `None` for URIs this server does not serve
    pub fn parse(uri: &str) -> Option<Self> {
        if uri == SCHEMA_URI {
            return Some(ResourceUri::Schema);
        }

        uri.strip_prefix(TABLE_URI_PREFIX)
            .filter(|table| !table.is_empty())
            .map(|table| ResourceUri::Table(table.to_string()))
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceUri::Schema => f.write_str(SCHEMA_URI),
            ResourceUri::Table(table) => write!(f, "{}{}", TABLE_URI_PREFIX, table),
        }
    }
}

fn resource(uri: ResourceUri, name: String, description: String) -> Resource {
    let mut raw = RawResource::new(uri.to_string(), name);
    raw.description = Some(description);
    raw.mime_type = Some(RESOURCE_MIME_TYPE.to_string());
    raw.no_annotation()
}

fn schema_resource() -> Resource {
    resource(
        ResourceUri::Schema,
        "Database Schema".to_string(),
        "Complete database schema with table definitions".to_string(),
    )
}

fn table_resource(table: &str) -> Resource {
    resource(
        ResourceUri::Table(table.to_string()),
        format!("Table: {}", table),
        format!("Data from the {} table", table),
    )
}

/// Schema resource plus one resource per table, read fresh from the store
///
/// A storage failure is logged and leaves only the schema resource.
pub fn resources(store: &Store) -> Vec<Resource> {
    let mut resources = vec![schema_resource()];

    match store.table_names() {
        Ok(tables) => resources.extend(tables.iter().map(|table| table_resource(table))),
        Err(e) => tracing::error!(error = %e, "Error getting schema for resource listing"),
    }

    resources
}
