//! Request router - maps protocol methods onto catalog and store operations
//!
//! The session hands over every request after the handshake. The router picks
//! the operation, validates its arguments, calls the store and shapes the
//! result. Every failure leaves as a [`ServerError`] and is converted to a
//! JSON-RPC error here, at the boundary.

use mcp_common::{
    json_success, text_success, to_result_value, IntoMcpError, McpResult, RequestHandler,
    ServerCapabilities, ServerInfo,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::catalog::{self, ResourceUri, ToolName, RESOURCE_MIME_TYPE};
use crate::error::{ErrorKind, ServerError, StoreError};
use crate::params::{ExecuteQueryParams, GetTableDataParams, GetTableSchemaParams};
use crate::store::Store;
use crate::types::ResourceText;

/// Rows served from a `sqlite://table/<name>` resource
pub const RESOURCE_ROW_LIMIT: u32 = 50;

const SERVER_NAME: &str = "sqlite-mcp";

const INSTRUCTIONS: &str = "SQLite database MCP server. \
    Browse the schema and table contents through resources. \
    Use execute_query for read-only SELECT queries, list_tables and get_table_schema \
    to explore structure, get_table_data to page through a table, and \
    create_sample_data to populate demonstration tables.";

/// Methods served after the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    ResourcesList,
    ResourcesRead,
    ToolsList,
    ToolsCall,
}

impl Method {
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "resources/list" => Some(Method::ResourcesList),
            "resources/read" => Some(Method::ResourcesRead),
            "tools/list" => Some(Method::ToolsList),
            "tools/call" => Some(Method::ToolsCall),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::ResourcesList => "resources/list",
            Method::ResourcesRead => "resources/read",
            Method::ToolsList => "tools/list",
            Method::ToolsCall => "tools/call",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Routes requests for one database
pub struct Router {
    store: Store,
}

impl Router {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run one method and return its JSON-RPC result
    pub fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, ServerError> {
        let method =
            Method::parse(method).ok_or_else(|| ServerError::UnknownMethod(method.to_string()))?;

        match method {
            Method::ResourcesList => Ok(json!({ "resources": catalog::resources(&self.store) })),
            Method::ResourcesRead => {
                let params: ReadResourceParams = parse_params(method, params)?;
                self.read_resource(&params.uri)
            }
            Method::ToolsList => Ok(json!({ "tools": catalog::tools() })),
            Method::ToolsCall => {
                let params: CallToolParams = parse_params(method, params)?;
                self.call_tool(&params.name, params.arguments)
            }
        }
    }

    fn read_resource(&self, uri: &str) -> Result<Value, ServerError> {
        let parsed =
            ResourceUri::parse(uri).ok_or_else(|| ServerError::UnknownResource(uri.to_string()))?;

        let text = match &parsed {
            ResourceUri::Schema => serde_json::to_string_pretty(&self.store.schema()?)?,
            ResourceUri::Table(table) => {
                serde_json::to_string_pretty(&self.store.table_data(table, RESOURCE_ROW_LIMIT)?)?
            }
        };

        let contents = ResourceText {
            uri: parsed.to_string(),
            mime_type: RESOURCE_MIME_TYPE.to_string(),
            text,
        };
        Ok(json!({ "contents": [contents] }))
    }

    fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<Value, ServerError> {
        let tool = ToolName::parse(name).ok_or_else(|| ServerError::UnknownTool(name.to_string()))?;
        let arguments = tool_arguments(tool, arguments)?;

        tracing::info!(tool = %tool, "Calling tool");

        let result = match tool {
            ToolName::ExecuteQuery => {
                let params: ExecuteQueryParams = parse_arguments(tool, arguments)?;
                json_success(&self.store.run_guarded(&params.query, &[])?)?
            }
            ToolName::GetTableSchema => {
                let params: GetTableSchemaParams = parse_arguments(tool, arguments)?;
                let schema = self
                    .store
                    .table_schema(&params.table_name)?
                    .ok_or(StoreError::TableNotFound(params.table_name))?;
                json_success(&schema)?
            }
            ToolName::ListTables => json_success(&self.store.table_names()?)?,
            ToolName::GetTableData => {
                let params: GetTableDataParams = parse_arguments(tool, arguments)?;
                json_success(&self.store.table_data(&params.table_name, params.limit)?)?
            }
            ToolName::CreateSampleData => {
                self.store.seed_sample_data()?;
                text_success("Sample data created successfully")
            }
        };

        Ok(to_result_value(&result)?)
    }
}

impl RequestHandler for Router {
    fn server_info(&self) -> ServerInfo {
        let mut info = ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        };
        info.server_info.name = SERVER_NAME.to_string();
        info.server_info.version = env!("CARGO_PKG_VERSION").to_string();
        info
    }

    fn handle(&self, method: &str, params: Option<Value>) -> McpResult<Value> {
        self.dispatch(method, params).map_err(|e| {
            match e.kind() {
                ErrorKind::Storage => tracing::error!(method, error = %e, "Request failed"),
                _ => tracing::debug!(method, error = %e, "Request rejected"),
            }
            e.into_mcp_error()
        })
    }
}

fn parse_params<T: DeserializeOwned>(method: Method, params: Option<Value>) -> Result<T, ServerError> {
    let params = params.unwrap_or_else(|| Value::Object(Map::new()));
    serde_json::from_value(params)
        .map_err(|e| ServerError::InvalidParams(format!("{}: {}", method.as_str(), e)))
}

/// Check required arguments and drop explicit nulls
///
/// A required argument that is absent, null or a blank string counts as
/// missing. Null optional arguments fall back to their defaults.
fn tool_arguments(tool: ToolName, arguments: Option<Value>) -> Result<Map<String, Value>, ServerError> {
    let mut arguments = match arguments {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(ServerError::InvalidArguments {
                tool: tool.to_string(),
                reason: format!("arguments must be an object, got {}", other),
            })
        }
    };

    for argument in tool.required_arguments() {
        let missing = match arguments.get(&argument) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        };
        if missing {
            return Err(ServerError::MissingArgument {
                tool: tool.to_string(),
                argument,
            });
        }
    }

    arguments.retain(|_, value| !value.is_null());
    Ok(arguments)
}

fn parse_arguments<T: DeserializeOwned>(
    tool: ToolName,
    arguments: Map<String, Value>,
) -> Result<T, ServerError> {
    serde_json::from_value(Value::Object(arguments)).map_err(|e| ServerError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_router() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("test.db")).unwrap();
        (dir, Router::new(store))
    }

    fn seeded_router() -> (TempDir, Router) {
        let (dir, router) = create_test_router();
        router.store().seed_sample_data().unwrap();
        (dir, router)
    }

    fn call(router: &Router, name: &str, arguments: Value) -> Result<Value, ServerError> {
        router.dispatch(
            "tools/call",
            Some(json!({ "name": name, "arguments": arguments })),
        )
    }

    /// Text of the single content block of a tool result
    fn tool_text(result: &Value) -> &str {
        assert_eq!(result["isError"], false);
        let content = result["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
        content[0]["text"].as_str().unwrap()
    }

    fn tool_json(result: &Value) -> Value {
        serde_json::from_str(tool_text(result)).unwrap()
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("tools/call"), Some(Method::ToolsCall));
        assert_eq!(Method::parse("resources/read"), Some(Method::ResourcesRead));
        assert_eq!(Method::parse("prompts/list"), None);
        assert_eq!(Method::ResourcesList.as_str(), "resources/list");
    }

    #[test]
    fn test_unknown_method() {
        let (_dir, router) = create_test_router();
        let err = router.dispatch("prompts/list", None).unwrap_err();
        assert!(matches!(err, ServerError::UnknownMethod(ref m) if m == "prompts/list"));
    }

    #[test]
    fn test_tools_list() {
        let (_dir, router) = create_test_router();
        let result = router.dispatch("tools/list", None).unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 5);
        assert_eq!(tools[0]["name"], "execute_query");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["query"]));
    }

    #[test]
    fn test_resources_list_empty_store() {
        let (_dir, router) = create_test_router();
        let result = router.dispatch("resources/list", None).unwrap();
        let resources = result["resources"].as_array().unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0]["uri"], "sqlite://schema");
        assert_eq!(resources[0]["name"], "Database Schema");
        assert_eq!(resources[0]["mimeType"], "application/json");
    }

    #[test]
    fn test_resources_list_seeded() {
        let (_dir, router) = seeded_router();
        let result = router.dispatch("resources/list", None).unwrap();
        let resources = result["resources"].as_array().unwrap();
        assert_eq!(resources.len(), 3);
        assert_eq!(resources[2]["uri"], "sqlite://table/users");
        assert_eq!(resources[2]["name"], "Table: users");
        assert_eq!(resources[2]["description"], "Data from the users table");
    }

    #[test]
    fn test_read_schema_resource() {
        let (_dir, router) = seeded_router();
        let result = router
            .dispatch("resources/read", Some(json!({ "uri": "sqlite://schema" })))
            .unwrap();
        let content = &result["contents"][0];
        assert_eq!(content["uri"], "sqlite://schema");
        assert_eq!(content["mimeType"], "application/json");

        let schema: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
        assert_eq!(schema[0]["name"], "products");
        assert_eq!(schema[1]["columns"][0]["name"], "id");
    }

    #[test]
    fn test_read_table_resource() {
        let (_dir, router) = seeded_router();
        let result = router
            .dispatch("resources/read", Some(json!({ "uri": "sqlite://table/products" })))
            .unwrap();
        let rows: Value =
            serde_json::from_str(result["contents"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 5);
        assert_eq!(rows[0]["name"], "Laptop");
    }

    #[test]
    fn test_read_resource_errors() {
        let (_dir, router) = create_test_router();

        let err = router
            .dispatch("resources/read", Some(json!({ "uri": "http://example.com" })))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = router
            .dispatch("resources/read", Some(json!({ "uri": "sqlite://table/ghosts" })))
            .unwrap_err();
        assert!(matches!(err, ServerError::Store(StoreError::TableNotFound(_))));

        let err = router
            .dispatch("resources/read", Some(json!({ "uri": "sqlite://table/a;b" })))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = router.dispatch("resources/read", None).unwrap_err();
        assert!(matches!(err, ServerError::InvalidParams(_)));
    }

    #[test]
    fn test_execute_query() {
        let (_dir, router) = seeded_router();
        let result = call(
            &router,
            "execute_query",
            json!({ "query": "SELECT name, email FROM users ORDER BY id LIMIT 3" }),
        )
        .unwrap();
        let rows = tool_json(&result);
        assert_eq!(rows.as_array().unwrap().len(), 3);
        assert_eq!(rows[0], json!({ "name": "John Doe", "email": "john@example.com" }));
    }

    #[test]
    fn test_execute_query_rejects_writes() {
        let (_dir, router) = seeded_router();

        let err = call(&router, "execute_query", json!({ "query": "DROP TABLE users" })).unwrap_err();
        assert_eq!(err.reason_code().as_deref(), Some("not-a-select"));

        let err = call(
            &router,
            "execute_query",
            json!({ "query": "SELECT * FROM users; DROP TABLE users" }),
        )
        .unwrap_err();
        assert_eq!(err.reason_code().as_deref(), Some("forbidden-pattern:DROP"));

        assert_eq!(router.store().table_names().unwrap(), vec!["products", "users"]);
    }

    #[test]
    fn test_missing_arguments() {
        let (_dir, router) = seeded_router();

        for arguments in [json!({}), json!({ "query": null }), json!({ "query": "   " })] {
            let err = call(&router, "execute_query", arguments).unwrap_err();
            assert_eq!(err.reason_code().as_deref(), Some("missing-argument:query"));
        }

        let err = router
            .dispatch("tools/call", Some(json!({ "name": "get_table_data" })))
            .unwrap_err();
        assert_eq!(err.reason_code().as_deref(), Some("missing-argument:table_name"));
    }

    #[test]
    fn test_invalid_arguments() {
        let (_dir, router) = seeded_router();

        let err = call(&router, "get_table_data", json!({ "table_name": "users", "limit": -1 }))
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidArguments { .. }));

        let err = call(&router, "get_table_data", json!({ "table_name": "users", "limit": "2" }))
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidArguments { .. }));

        let err = call(&router, "execute_query", json!("SELECT 1")).unwrap_err();
        assert!(matches!(err, ServerError::InvalidArguments { .. }));
    }

    #[test]
    fn test_unknown_tool() {
        let (_dir, router) = create_test_router();
        let err = call(&router, "drop_database", json!({})).unwrap_err();
        assert!(matches!(err, ServerError::UnknownTool(ref t) if t == "drop_database"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_get_table_schema() {
        let (_dir, router) = seeded_router();
        let result = call(&router, "get_table_schema", json!({ "table_name": "users" })).unwrap();
        let schema = tool_json(&result);
        assert_eq!(schema["name"], "users");
        assert_eq!(schema["columns"].as_array().unwrap().len(), 5);
        assert_eq!(schema["columns"][2]["name"], "email");

        let err = call(&router, "get_table_schema", json!({ "table_name": "orders" })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_list_tables() {
        let (_dir, router) = seeded_router();
        let result = call(&router, "list_tables", json!({})).unwrap();
        assert_eq!(tool_json(&result), json!(["products", "users"]));

        let result = router
            .dispatch("tools/call", Some(json!({ "name": "list_tables" })))
            .unwrap();
        assert_eq!(tool_json(&result), json!(["products", "users"]));
    }

    #[test]
    fn test_get_table_data_limits() {
        let (_dir, router) = seeded_router();

        let result = call(&router, "get_table_data", json!({ "table_name": "users", "limit": 2 }))
            .unwrap();
        let rows = tool_json(&result);
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        let keys: Vec<&str> = rows[0].as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "name", "email", "age", "created_at"]);

        let result = call(&router, "get_table_data", json!({ "table_name": "products", "limit": null }))
            .unwrap();
        assert_eq!(tool_json(&result).as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_create_sample_data_twice() {
        let (_dir, router) = create_test_router();

        let result = call(&router, "create_sample_data", json!({})).unwrap();
        assert_eq!(tool_text(&result), "Sample data created successfully");
        let result = call(&router, "create_sample_data", json!({})).unwrap();
        assert_eq!(tool_text(&result), "Sample data created successfully");

        let rows = router.store().run_guarded("SELECT COUNT(*) AS n FROM users", &[]).unwrap();
        assert_eq!(rows[0]["n"], 4);
    }

    #[test]
    fn test_handle_converts_errors() {
        let (_dir, router) = create_test_router();
        let err = router
            .handle("tools/call", Some(json!({ "name": "execute_query", "arguments": {} })))
            .unwrap_err();
        assert_eq!(err.code.0, -32602);
        let data = err.data.unwrap();
        assert_eq!(data["kind"], "validation");
        assert_eq!(data["reason"], "missing-argument:query");

        let err = router.handle("bogus", None).unwrap_err();
        assert_eq!(err.code.0, -32601);
    }

    #[test]
    fn test_server_info() {
        let (_dir, router) = create_test_router();
        let info = to_result_value(&router.server_info()).unwrap();
        assert_eq!(info["serverInfo"]["name"], "sqlite-mcp");
        assert!(info["capabilities"]["tools"].is_object());
        assert!(info["capabilities"]["resources"].is_object());
        assert!(info["instructions"].as_str().unwrap().contains("execute_query"));
    }
}
