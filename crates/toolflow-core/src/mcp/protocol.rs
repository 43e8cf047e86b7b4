//! Tool server wire protocol
//!
//! Line-framed JSON over stdio. One request object per line, one response
//! object per line. A response carrying an `error` field marks failure.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// A framed tool call request.
#[derive(Debug, Serialize)]
pub struct ToolCallRequest {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub tool: String,
    pub parameters: Value,
    pub timestamp: DateTime<Utc>,
}

impl ToolCallRequest {
    pub fn new(tool: impl Into<String>, parameters: Value) -> Self {
        Self {
            kind: "tool_call",
            tool: tool.into(),
            parameters,
            timestamp: Utc::now(),
        }
    }
}

/// Attach invocation metadata to a raw server response.
///
/// The server owns the response shape; the engine only adds bookkeeping
/// fields so callers can correlate results with the plan step that
/// produced them.
pub fn annotate_response(mut response: Value, tool_name: &str, process_id: &str) -> Value {
    if let Some(object) = response.as_object_mut() {
        object.insert("tool_name".to_string(), Value::String(tool_name.to_string()));
        object.insert("process_id".to_string(), Value::String(process_id.to_string()));
        object.insert(
            "invoked_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
    }
    response
}

/// Whether a server response signals a tool-level failure.
pub fn is_error_response(response: &Value) -> bool {
    response.get("error").is_some()
}
