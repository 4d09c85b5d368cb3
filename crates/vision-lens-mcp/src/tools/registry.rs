//! Tool registration and dispatch.

use std::sync::Arc;

use serde_json::Value;

use vision_lens::{VisionClient, VisionResult};

use crate::config::ServerConfig;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::analyze_image;

/// Read-only state every tool call borrows.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub config: Arc<ServerConfig>,
    pub client: VisionClient,
}

impl ToolContext {
    pub fn new(config: ServerConfig) -> VisionResult<Self> {
        let client = VisionClient::new(&config.api_base, config.request_timeout)?;
        tracing::debug!("Vision API endpoint: {}", client.endpoint());
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![analyze_image::definition()]
    }

    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        api_key: &str,
        ctx: &ToolContext,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        match name {
            analyze_image::TOOL_NAME => analyze_image::execute(args, api_key, ctx).await,
            _ => Err(McpError::MethodNotFound(format!("unknown tool '{name}'"))),
        }
    }
}
