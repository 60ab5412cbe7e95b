//! Result helpers for MCP tool responses
//!
//! Tools answer with a `CallToolResult` holding text content blocks. These
//! helpers build that result and flatten it into the JSON value placed in a
//! JSON-RPC `result` field.

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::Value;

/// Create a successful response holding pretty-printed JSON
///
/// ```rust,ignore
/// let result = json_success(&rows)?;
/// ```
pub fn json_success<T: Serialize + ?Sized>(data: &T) -> Result<CallToolResult, serde_json::Error> {
    let json = serde_json::to_string_pretty(data)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Create a successful plain text response
pub fn text_success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Serialize any protocol payload into the value sent as a JSON-RPC result
pub fn to_result_value<T: Serialize + ?Sized>(payload: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_json_success() {
        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };
        let result = json_success(&data).unwrap();
        assert!(!result.is_error.unwrap_or(false));
        assert_eq!(result.content.len(), 1);

        let value = to_result_value(&result).unwrap();
        let text = value["content"][0]["text"].as_str().unwrap();
        let parsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed["value"], 42);
    }

    #[test]
    fn test_text_success() {
        let result = text_success("hello world");
        let value = to_result_value(&result).unwrap();
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "hello world");
    }
}
