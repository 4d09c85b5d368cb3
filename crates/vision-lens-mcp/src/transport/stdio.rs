//! Stdio transport: reads JSON-RPC from stdin, writes to stdout.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::protocol::ProtocolHandler;
use crate::types::{JsonRpcMessage, McpError, McpResult, RequestId};

use super::framing::{self, LineFramer};

const READ_CHUNK: usize = 8 * 1024;

/// Stdio transport for desktop MCP clients.
///
/// Each request runs in its own task and replies as soon as it finishes, so
/// replies may leave out of order; clients correlate by `id`. A single writer
/// task owns the output stream, which keeps every reply on its own line. The
/// reply queue is unbounded: a reader that stops draining stdout makes it grow.
pub struct StdioTransport {
    handler: Arc<ProtocolHandler>,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Run the transport loop: reads from stdin, writes to stdout.
    pub async fn run(&self) -> McpResult<()> {
        tracing::info!("Stdio transport started");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve one connection until `reader` reaches EOF and every in-flight
    /// request has replied.
    pub async fn serve<R, W>(&self, mut reader: R, writer: W) -> McpResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Value>();
        let writer_task = tokio::spawn(write_loop(writer, rx));

        let mut framer = LineFramer::new();
        let mut in_flight = JoinSet::new();
        let mut chunk = vec![0u8; READ_CHUNK];

        loop {
            let n = reader.read(&mut chunk).await.map_err(McpError::Io)?;
            if n == 0 {
                if framer.buffered() > 0 {
                    tracing::debug!("Flushing {} unterminated byte(s) at EOF", framer.buffered());
                }
                if let Some(line) = framer.finish() {
                    self.dispatch_line(&line, &tx, &mut in_flight);
                }
                tracing::info!(
                    "EOF on stdin, waiting for {} in-flight request(s)",
                    in_flight.len()
                );
                break;
            }

            for line in framer.push(&chunk[..n]) {
                self.dispatch_line(&line, &tx, &mut in_flight);
            }

            while let Some(done) = in_flight.try_join_next() {
                log_task_result(done);
            }
        }

        while let Some(done) = in_flight.join_next().await {
            log_task_result(done);
        }

        drop(tx);
        writer_task
            .await
            .map_err(|e| McpError::InternalError(format!("writer task failed: {e}")))?
    }

    fn dispatch_line(
        &self,
        line: &[u8],
        tx: &mpsc::UnboundedSender<Value>,
        in_flight: &mut JoinSet<()>,
    ) {
        match framing::parse_message(line) {
            Ok(JsonRpcMessage::Request(request)) => {
                let handler = self.handler.clone();
                let tx = tx.clone();
                in_flight.spawn(async move {
                    let id = request.id.clone();
                    let method = request.method.clone();
                    // Inner task so a panicking handler still yields a reply for its id.
                    let task = tokio::spawn(async move { handler.handle_request(request).await });
                    let reply = match task.await {
                        Ok(reply) => reply,
                        Err(e) => {
                            tracing::error!("Handler for {method} (id {id}) aborted: {e}");
                            let error =
                                McpError::InternalError(format!("handler for '{method}' aborted"));
                            error_value(error, id)
                        }
                    };
                    send(&tx, reply);
                });
            }
            Ok(msg @ JsonRpcMessage::Notification(_)) => {
                let handler = self.handler.clone();
                in_flight.spawn(async move {
                    let method = msg.method().to_string();
                    if handler.handle_message(msg).await.is_some() {
                        tracing::warn!("Notification '{method}' produced a reply; dropping it");
                    }
                });
            }
            Err(e) => {
                tracing::warn!("Parse error: {e}");
                send(tx, error_value(e, RequestId::Null));
            }
        }
    }
}

fn error_value(error: McpError, id: RequestId) -> Value {
    let envelope = error.to_json_rpc_error(id);
    serde_json::to_value(&envelope).unwrap_or_else(|e| {
        serde_json::json!({
            "jsonrpc": envelope.jsonrpc,
            "id": envelope.id,
            "error": { "code": envelope.error.code, "message": e.to_string() },
        })
    })
}

fn send(tx: &mpsc::UnboundedSender<Value>, reply: Value) {
    if tx.send(reply).is_err() {
        tracing::debug!("Output closed; dropping reply");
    }
}

fn log_task_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!("Request task failed: {e}");
    }
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Value>) -> McpResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(reply) = rx.recv().await {
        let framed = framing::frame_message(&reply)?;
        writer
            .write_all(framed.as_bytes())
            .await
            .map_err(McpError::Io)?;
        writer.flush().await.map_err(McpError::Io)?;
    }
    Ok(())
}
