//! MCP handshake during initialization.

use serde_json::Value;

use crate::types::{InitializeParams, InitializeResult, MCP_VERSION};

/// Answer an `initialize` request. Never fails: unreadable params are logged
/// and a client asking for another protocol version gets ours anyway.
pub fn negotiate(params: Option<Value>) -> InitializeResult {
    let params = match params.map(serde_json::from_value::<InitializeParams>) {
        Some(Ok(p)) => p,
        Some(Err(e)) => {
            tracing::warn!("Ignoring malformed initialize params: {e}");
            InitializeParams::default()
        }
        None => InitializeParams::default(),
    };

    match params.protocol_version.as_deref() {
        Some(MCP_VERSION) | None => {}
        Some(requested) => tracing::warn!(
            "Client requested protocol version {requested}, server supports {MCP_VERSION}. \
             Proceeding with server version."
        ),
    }

    tracing::info!(
        "Initialized with client: {} v{}",
        params.client_info.name,
        params.client_info.version
    );

    InitializeResult::default_result()
}
