//! End-to-end transport tests: newline-delimited JSON in, replies out.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::AsyncReadExt;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vision_lens_mcp::config::ServerConfig;
use vision_lens_mcp::protocol::ProtocolHandler;
use vision_lens_mcp::tools::ToolContext;
use vision_lens_mcp::transport::StdioTransport;

// ─────────────────────── helpers ───────────────────────

fn transport(config: ServerConfig) -> StdioTransport {
    StdioTransport::new(ProtocolHandler::new(ToolContext::new(config).unwrap()))
}

/// Serve `reader` to completion and return every output line as JSON.
async fn run<R>(transport: &StdioTransport, reader: R) -> Vec<Value>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let (server_side, mut client_side) = tokio::io::duplex(64 * 1024);

    let collect = async move {
        let mut out = String::new();
        client_side.read_to_string(&mut out).await.unwrap();
        out
    };
    let (served, out) = tokio::join!(transport.serve(reader, server_side), collect);
    served.unwrap();

    assert!(out.is_empty() || out.ends_with('\n'), "unterminated output: {out:?}");
    out.lines()
        .map(|line| serde_json::from_str(line).expect("each output line is one JSON value"))
        .collect()
}

fn answer(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }]
    }))
}

// ═══════════════════════════════════════════════════════
// FRAMING
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_split_reads_and_blank_lines() {
    let transport = transport(ServerConfig::default());

    // Envelopes and delimiters are split across reads.
    let reader = tokio_test::io::Builder::new()
        .read(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"met")
        .read(b"hod\":\"ping\"}")
        .read(b"\n\n   \n{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\r")
        .read(b"\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n")
        .build();

    let replies = run(&transport, reader).await;
    assert_eq!(replies.len(), 2, "{replies:?}");

    let by_id: HashMap<i64, &Value> = replies
        .iter()
        .map(|r| (r["id"].as_i64().unwrap(), r))
        .collect();
    assert_eq!(by_id[&1]["result"], json!({}));
    assert_eq!(by_id[&2]["result"]["tools"][0]["name"], "analyze_image");
}

#[tokio::test]
async fn test_unterminated_last_line_is_processed() {
    let transport = transport(ServerConfig::default());
    let reader = tokio_test::io::Builder::new()
        .read(b"{\"jsonrpc\":\"2.0\",\"id\":\"tail\",\"method\":\"ping\"}")
        .build();

    let replies = run(&transport, reader).await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], "tail");
}

#[tokio::test]
async fn test_parse_error_replies_with_null_id_and_continues() {
    let transport = transport(ServerConfig::default());
    let input = concat!(
        "{not json\n",
        "[{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}]\n",
        "{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n",
    );

    let replies = run(&transport, input.as_bytes()).await;
    assert_eq!(replies.len(), 3, "{replies:?}");

    let errors: Vec<&Value> = replies.iter().filter(|r| r.get("error").is_some()).collect();
    assert_eq!(errors.len(), 2);
    for err in errors {
        assert_eq!(err["id"], Value::Null);
        assert_eq!(err["error"]["code"], -32700);
    }
    assert!(replies.iter().any(|r| r["id"] == 7 && r["result"] == json!({})));
}

#[tokio::test]
async fn test_invalid_utf8_is_parse_error() {
    let transport = transport(ServerConfig::default());
    let mut input = br#"{"jsonrpc":"2.0","id":3,"method":"ping","params":{"x":""#.to_vec();
    input.push(0xFF);
    input.extend_from_slice(b"\"}}\n");

    let replies = run(&transport, &input[..]).await;
    assert_eq!(replies.len(), 1, "{replies:?}");
    assert_eq!(replies[0]["id"], Value::Null);
    assert_eq!(replies[0]["error"]["code"], -32700);
}

#[tokio::test]
async fn test_non_integer_ids_are_echoed() {
    let transport = transport(ServerConfig::default());
    let input = concat!(
        "{\"jsonrpc\":\"2.0\",\"id\":1.5,\"method\":\"ping\"}\n",
        "{\"jsonrpc\":\"2.0\",\"id\":18446744073709551615,\"method\":\"ping\"}\n",
    );

    let replies = run(&transport, input.as_bytes()).await;
    assert_eq!(replies.len(), 2, "{replies:?}");
    for reply in &replies {
        assert_eq!(reply["result"], json!({}), "{reply}");
    }
    assert!(replies.iter().any(|r| r["id"] == json!(1.5)));
    assert!(replies.iter().any(|r| r["id"] == json!(u64::MAX)));
}

#[tokio::test]
async fn test_notifications_produce_no_output() {
    let transport = transport(ServerConfig::default());
    let input = concat!(
        "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
        "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/cancelled\",\"params\":{\"requestId\":1}}\n",
        "{\"jsonrpc\":\"2.0\",\"method\":\"tools/call\",\"params\":{\"name\":\"analyze_image\"}}\n",
        "{\"jsonrpc\":\"2.0\",\"method\":\"no/such/method\"}\n",
    );

    let replies = run(&transport, input.as_bytes()).await;
    assert!(replies.is_empty(), "{replies:?}");
}

#[tokio::test]
async fn test_empty_input() {
    let transport = transport(ServerConfig::default());
    let replies = run(&transport, &b""[..]).await;
    assert!(replies.is_empty());
}

// ═══════════════════════════════════════════════════════
// CONCURRENCY
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_every_request_answered_exactly_once() {
    let transport = transport(ServerConfig::default());

    let mut input = String::new();
    for id in 0..50 {
        let method = match id % 4 {
            0 => "ping",
            1 => "tools/list",
            2 => "tools/call",
            _ => "unknown/method",
        };
        input.push_str(&format!(
            "{{\"jsonrpc\":\"2.0\",\"id\":{id},\"method\":\"{method}\"}}\n"
        ));
        input.push_str("{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n");
    }

    let replies = run(&transport, input.as_bytes()).await;
    assert_eq!(replies.len(), 50);

    let mut seen: Vec<i64> = replies.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..50).collect::<Vec<_>>());

    for reply in &replies {
        let id = reply["id"].as_i64().unwrap();
        match id % 4 {
            0 | 1 => assert!(reply.get("result").is_some(), "{reply}"),
            2 => assert_eq!(reply["error"]["code"], -32001),
            _ => assert_eq!(reply["error"]["code"], -32601),
        }
    }
}

#[tokio::test]
async fn test_slow_call_does_not_block_later_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [{ "content": [{ "type": "text", "text": "slow" }] }]
        })))
        .respond_with(answer("slow answer").set_delay(Duration::from_millis(800)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [{ "content": [{ "type": "text", "text": "fast" }] }]
        })))
        .respond_with(answer("fast answer"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("img.png");
    image::DynamicImage::new_rgb8(64, 64)
        .save_with_format(&image, image::ImageFormat::Png)
        .unwrap();
    let image = image.to_str().unwrap();

    let transport = transport(
        ServerConfig {
            api_base: server.uri(),
            ..ServerConfig::default()
        }
        .with_api_key(Some("sk-test".to_string())),
    );

    let call = |id: &str, question: &str| {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {
                "name": "analyze_image",
                "arguments": { "image_path": image, "question": question }
            }
        })
        .to_string()
    };
    let input = format!(
        "{}\n{}\n{}\n",
        call("slow", "slow"),
        call("fast", "fast"),
        json!({"jsonrpc": "2.0", "id": "ping", "method": "ping"})
    );

    let replies = run(&transport, input.as_bytes()).await;
    assert_eq!(replies.len(), 3, "{replies:?}");

    // The slow call was read first but finishes last.
    assert_eq!(replies[2]["id"], "slow");

    let by_id: HashMap<&str, &Value> = replies
        .iter()
        .map(|r| (r["id"].as_str().unwrap(), r))
        .collect();
    assert_eq!(by_id["slow"]["result"]["content"][0]["text"], "slow answer");
    assert_eq!(by_id["fast"]["result"]["content"][0]["text"], "fast answer");
    assert_eq!(by_id["ping"]["result"], json!({}));
}
