//! MCP JSON-RPC protocol handler.
//!
//! Transport independent: takes one decoded JSON-RPC message and produces at
//! most one response. Implements `initialize`, `ping`, `tools/list`,
//! `tools/call`, `resources/list`, `resources/read` and
//! `resources/templates/list`. Notifications never get a response.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::categories::CATEGORIES_MIME_TYPE;
use crate::tools::{ExpenseTools, ToolError, resource_definitions, tool_definitions};

pub const SERVER_NAME: &str = "ExpenseTracker";

/// Protocol revisions this server can speak, newest first
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];

/// Revision offered when the client asks for one we don't know
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

// ---------------------------------------------------------------------------
// JSON-RPC message types
// ---------------------------------------------------------------------------

/// Incoming JSON-RPC request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Outgoing JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MCP Server
// ---------------------------------------------------------------------------

/// MCP method router over the expense tool surface
///
/// Holds no per-session state; every request is served independently.
#[derive(Debug, Clone)]
pub struct McpServer {
    tools: ExpenseTools,
}

impl McpServer {
    pub fn new(tools: ExpenseTools) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ExpenseTools {
        &self.tools
    }

    /// Decode one raw message and handle it.
    ///
    /// Only single request objects are accepted; batches and other non-object
    /// JSON get `-32600`.
    pub fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Invalid JSON: {}", e),
                ));
            }
        };

        if !value.is_object() {
            return Some(JsonRpcResponse::error(
                Value::Null,
                INVALID_REQUEST,
                "Request must be a single JSON-RPC object",
            ));
        }

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request),
            Err(e) => Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Invalid JSON-RPC request: {}", e),
            )),
        }
    }

    /// Handle a single JSON-RPC message.
    pub fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" || request.method.is_empty() {
            return request
                .id
                .map(|id| JsonRpcResponse::error(id, INVALID_REQUEST, "Invalid JSON-RPC request"));
        }

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        debug!(method = %request.method, "MCP request");
        let response = match request.method.as_str() {
            "initialize" => handle_initialize(id, &request.params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tools_call(id, &request.params),
            "resources/list" => JsonRpcResponse::success(id, json!({ "resources": resource_definitions() })),
            "resources/templates/list" => JsonRpcResponse::success(id, json!({ "resourceTemplates": [] })),
            "resources/read" => self.handle_resources_read(id, &request.params),
            _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Unknown method: {}", request.method)),
        };

        Some(response)
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" | "initialized" => info!("[MCP] Client initialized"),
            "notifications/cancelled" => info!("[MCP] Request cancelled: {:?}", request.params),
            other => debug!(method = other, "Ignoring notification"),
        }
    }

    /// Handle `tools/call` -- store failures become `isError` results.
    fn handle_tools_call(&self, id: Value, params: &Value) -> JsonRpcResponse {
        let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
        if name.is_empty() {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing tool name in params");
        }
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.tools.call(name, arguments) {
            Ok(value) => JsonRpcResponse::success(id, tool_result(value)),
            Err(ToolError::Failed(e)) => JsonRpcResponse::success(id, tool_error_result(&format!("{:#}", e))),
            Err(e) => JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string()),
        }
    }

    /// Handle `resources/read`.
    fn handle_resources_read(&self, id: Value, params: &Value) -> JsonRpcResponse {
        let Some(uri) = params.get("uri").and_then(|v| v.as_str()) else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing resource uri in params");
        };

        match self.tools.read_resource(uri) {
            Ok(text) => JsonRpcResponse::success(
                id,
                json!({
                    "contents": [{
                        "uri": uri,
                        "mimeType": CATEGORIES_MIME_TYPE,
                        "text": text,
                    }]
                }),
            ),
            Err(e @ ToolError::Failed(_)) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
            Err(e) => JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string()),
        }
    }
}

/// Handle `initialize` -- return server capabilities.
fn handle_initialize(id: Value, params: &Value) -> JsonRpcResponse {
    let requested = params.get("protocolVersion").and_then(|v| v.as_str());
    let version = requested
        .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    JsonRpcResponse::success(
        id,
        json!({
            "protocolVersion": version,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        }),
    )
}

/// Wrap a successful tool value as an MCP tool result.
fn tool_result(value: Value) -> Value {
    let text = value.to_string();
    let structured = if value.is_object() {
        value
    } else {
        json!({ "result": value })
    };
    json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": structured,
        "isError": false
    })
}

fn tool_error_result(message: &str) -> Value {
    json!({
        "content": [{ "type": "text", "text": message }],
        "isError": true
    })
}
