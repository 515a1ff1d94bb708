//! Tool-invocation adapter: an MCP server over stdio.
//!
//! Speaks JSON-RPC 2.0, one message per line, on stdin/stdout (logging must
//! therefore go to stderr; the binary sets that up). Only the tool surface
//! is implemented: `initialize`, `tools/list`, and `tools/call` for the
//! three synthesis tools in [`tools`].
//!
//! Tool failures are reported as `isError` tool results, not protocol
//! errors; the caller interprets them as a failed invocation.

pub mod tools;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::state::AppState;

/// MCP protocol revision this server implements
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const SERVER_NAME: &str = "cosyvoice3-mcp";

// JSON-RPC 2.0 error codes
const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    /// Absent for notifications, which get no response
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// The MCP server: shared application context plus the dispatch loop
pub struct McpServer {
    state: Arc<AppState>,
}

impl McpServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Serve requests from stdin until it closes.
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        info!(server = SERVER_NAME, "serving MCP over stdio");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            let mut payload = serde_json::to_vec(&response)?;
            payload.push(b'\n');
            stdout.write_all(&payload).await?;
            stdout.flush().await?;
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle one raw message; `None` means nothing is written back.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                error!("unparseable request: {e}");
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("parse error: {e}"),
                ));
            }
        };
        self.handle_request(request).await
    }

    /// Dispatch one request; notifications produce no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "handling request");
        let Some(id) = request.id else {
            // Notification; nothing expects a reply.
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::result(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            ),
            "ping" => JsonRpcResponse::result(id, json!({})),
            "tools/list" => {
                JsonRpcResponse::result(id, json!({ "tools": tools::descriptors() }))
            }
            "tools/call" => return Some(self.call_tool(id, request.params).await),
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            ),
        };
        Some(response)
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params = params.unwrap_or(Value::Null);
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "missing tool name");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        match tools::call(&self.state, name, &arguments).await {
            Ok(result) => JsonRpcResponse::result(
                id,
                json!({
                    "content": [{ "type": "text", "text": result.to_string() }],
                    "isError": false,
                }),
            ),
            Err(tools::ToolCallError::UnknownTool(name)) => {
                JsonRpcResponse::error(id, INVALID_PARAMS, format!("unknown tool: {name}"))
            }
            Err(tools::ToolCallError::Failed(err)) => {
                error!(tool = name, "tool call failed: {err}");
                JsonRpcResponse::result(
                    id,
                    json!({
                        "content": [{ "type": "text", "text": err.to_string() }],
                        "isError": true,
                    }),
                )
            }
        }
    }
}
