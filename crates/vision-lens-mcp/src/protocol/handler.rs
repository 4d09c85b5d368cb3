//! Main request dispatcher: receives JSON-RPC messages, routes to handlers.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::tools::{ToolContext, ToolRegistry};
use crate::types::*;

use super::negotiation::negotiate;

/// The main protocol handler that dispatches incoming JSON-RPC messages.
///
/// The method table is fixed at compile time and the tool context is
/// read-only, so one handler is shared by every in-flight request.
pub struct ProtocolHandler {
    tools: ToolContext,
    initialized: AtomicBool,
}

impl ProtocolHandler {
    pub fn new(tools: ToolContext) -> Self {
        Self {
            tools,
            initialized: AtomicBool::new(false),
        }
    }

    /// Whether the client has sent `notifications/initialized`.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    /// Handle one inbound message. Requests always yield a reply;
    /// notifications never do.
    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        let id = request.id.clone();
        let result = self.dispatch_request(&request.method, request.params).await;

        let envelope = match result {
            Ok(value) => serde_json::to_value(JsonRpcResponse::new(id.clone(), value)),
            Err(e) => {
                if e.is_classified() {
                    tracing::debug!("Request {id} ({}) failed: {e}", request.method);
                } else {
                    tracing::error!("Request {id} ({}) failed: {e}", request.method);
                }
                serde_json::to_value(e.to_json_rpc_error(id.clone()))
            }
        };

        envelope.unwrap_or_else(|e| {
            tracing::error!("Failed to serialize reply for request {id}: {e}");
            serde_json::json!({
                "jsonrpc": JSONRPC_VERSION,
                "id": id,
                "error": { "code": error_codes::INTERNAL_ERROR, "message": e.to_string() },
            })
        })
    }

    async fn dispatch_request(&self, method: &str, params: Option<Value>) -> McpResult<Value> {
        match method {
            "initialize" => Ok(serde_json::to_value(negotiate(params))?),
            "ping" => Ok(Value::Object(serde_json::Map::new())),

            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(params).await,

            "" => Err(McpError::MethodNotFound(
                "request has no method".to_string(),
            )),
            _ => Err(McpError::MethodNotFound(method.to_string())),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => {
                self.initialized.store(true, Ordering::Relaxed);
                tracing::info!("MCP handshake complete");
            }
            "notifications/cancelled" => {
                let reason = notification
                    .params
                    .and_then(|p| serde_json::from_value::<CancelledParams>(p).ok());
                // Calls always run to completion; the reply for the original id still goes out.
                tracing::info!("Received cancellation notification: {reason:?}");
            }
            method => {
                if let Err(e) = self.dispatch_request(method, notification.params).await {
                    tracing::warn!("Notification '{method}' failed: {e}");
                } else {
                    tracing::debug!("Notification '{method}' handled, result discarded");
                }
            }
        }
    }

    async fn handle_tools_list(&self) -> McpResult<Value> {
        let result = ToolListResult {
            tools: ToolRegistry::list_tools(),
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> McpResult<Value> {
        let api_key = self
            .tools
            .config
            .api_key()
            .ok_or(McpError::MissingApiKey)?;

        let call_params: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Tool call params required".to_string()))?;

        let result =
            ToolRegistry::call(&call_params.name, call_params.arguments, api_key, &self.tools)
                .await?;

        Ok(serde_json::to_value(result)?)
    }
}
