//! Message framing for newline-delimited JSON.

use serde_json::Value;

use crate::types::{
    JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, McpError, McpResult, RequestId,
    JSONRPC_VERSION,
};

/// Reassembles newline-delimited lines from arbitrarily split byte chunks.
///
/// Lines are handed out as raw bytes; UTF-8 is checked by the JSON parser so
/// an invalid sequence is a parse error rather than a replacement character.
///
/// There is no cap on how much is buffered while waiting for a `\n`; a peer
/// that never sends one grows the buffer without bound.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
    /// Bytes of `buf` already known to contain no delimiter.
    scanned: usize,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completes. Blank lines are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buf[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            if let Some(line) = take_line(&self.buf[start..end]) {
                lines.push(line);
            }
            start = end + 1;
            from = start;
        }

        self.buf.drain(..start);
        self.scanned = self.buf.len();
        lines
    }

    /// Flush a final unterminated line at end of input.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        self.scanned = 0;
        let rest = std::mem::take(&mut self.buf);
        take_line(&rest)
    }

    /// Bytes held while waiting for a delimiter.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

fn take_line(raw: &[u8]) -> Option<Vec<u8>> {
    let line = raw.strip_suffix(b"\r").unwrap_or(raw);
    if is_blank(line) {
        None
    } else {
        Some(line.to_vec())
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Parse a single line as a JSON-RPC message.
///
/// Only JSON syntax (including UTF-8 validity) and the object shape are
/// checked here; a missing method or malformed params is left to dispatch so
/// the reply can carry the id.
pub fn parse_message(line: impl AsRef<[u8]>) -> McpResult<JsonRpcMessage> {
    let line = line.as_ref();
    if is_blank(line) {
        return Err(McpError::ParseError("Empty message".to_string()));
    }

    let value: Value =
        serde_json::from_slice(line).map_err(|e| McpError::ParseError(e.to_string()))?;

    let Value::Object(mut map) = value else {
        return Err(McpError::ParseError(
            "expected a single JSON-RPC object (batches are not supported)".to_string(),
        ));
    };

    let jsonrpc = match map.remove("jsonrpc") {
        Some(Value::String(v)) => v,
        other => {
            tracing::debug!("Envelope has unexpected jsonrpc marker: {other:?}");
            JSONRPC_VERSION.to_string()
        }
    };
    let method = match map.remove("method") {
        Some(Value::String(m)) => m,
        _ => String::new(),
    };
    let params = map.remove("params");

    match map.remove("id") {
        Some(raw_id) => {
            let id: RequestId = serde_json::from_value(raw_id)
                .map_err(|e| McpError::ParseError(format!("invalid request id: {e}")))?;
            Ok(JsonRpcMessage::Request(JsonRpcRequest {
                jsonrpc,
                id,
                method,
                params,
            }))
        }
        None => Ok(JsonRpcMessage::Notification(JsonRpcNotification {
            jsonrpc,
            method,
            params,
        })),
    }
}

/// Serialize a value to a JSON line (with trailing newline).
pub fn frame_message(value: &Value) -> McpResult<String> {
    let mut json = serde_json::to_string(value).map_err(McpError::Json)?;
    json.push('\n');
    Ok(json)
}
