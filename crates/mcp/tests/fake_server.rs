#![cfg(unix)]

use std::collections::BTreeMap;
use std::time::Duration;

use mcp_chat_mcp::proto::Content;
use mcp_chat_mcp::{ErrorKind, McpClient, McpServers, ServerDescriptor};
use serde_json::Map;

// A tiny MCP server in POSIX shell. It answers by pattern matching the
// request lines, which is enough for compact single-line JSON.
const FAKE_SERVER: &str = r#"
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2025-03-26","capabilities":{"tools":{}},"serverInfo":{"name":"fake","version":"0.0.1"}}}\n' "$id"
      ;;
    *'"cursor":"page-2"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"env","inputSchema":{"type":"object"}}]}}\n' "$id"
      ;;
    *'"method":"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"echo","description":"Echoes","inputSchema":{"type":"object"}}],"nextCursor":"page-2"}}\n' "$id"
      ;;
    *'"name":"echo"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"hello from fake"}],"isError":false}}\n' "$id"
      ;;
    *'"name":"env"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"%s"}]}}\n' "$id" "$FAKE_GREETING"
      ;;
    *'"name":"fail"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"boom"}],"isError":true}}\n' "$id"
      ;;
    *'"name":"ping_me"'*)
      printf '{"jsonrpc":"2.0","id":"srv-1","method":"ping"}\n'
      IFS= read -r reply
      case "$reply" in
        *'"id":"srv-1","result":{}'*) text=pong-ok ;;
        *) text=pong-bad ;;
      esac
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"%s"}]}}\n' "$id" "$text"
      ;;
    *'"name":"hang"'*)
      ;;
    *'"name":"crash"'*)
      exit 3
      ;;
    *'"method":"tools/call"'*)
      printf '{"jsonrpc":"2.0","id":%s,"error":{"code":-32602,"message":"Unknown tool"}}\n' "$id"
      ;;
  esac
done
"#;

fn fake_server(name: &str) -> ServerDescriptor {
    ServerDescriptor::new(name, "/bin/sh", ["-c", FAKE_SERVER]).with_env(
        BTreeMap::from([("FAKE_GREETING".to_owned(), "hi there".to_owned())]),
    )
}

fn text_of(content: &[Content]) -> Vec<&str> {
    content
        .iter()
        .filter_map(|block| match block {
            Content::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_handshake_and_list_tools() {
    let client = McpClient::connect(&fake_server("fake")).await.unwrap();
    let info = client.server_info().unwrap();
    assert_eq!(info.name, "fake");
    assert_eq!(info.version, "0.0.1");

    let tools = client.list_tools().await.unwrap();
    let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["echo", "env"]);
    assert_eq!(tools[0].description.as_deref(), Some("Echoes"));
    assert_eq!(tools[1].description, None);

    client.shutdown().await;
}

#[tokio::test]
async fn test_call_tool() {
    let client = McpClient::connect(&fake_server("fake")).await.unwrap();

    let result = client.call_tool("echo", Map::new()).await.unwrap();
    assert_eq!(text_of(&result.content), ["hello from fake"]);
    assert!(!result.is_error);

    let result = client.call_tool("env", Map::new()).await.unwrap();
    assert_eq!(text_of(&result.content), ["hi there"]);

    let result = client.call_tool("fail", Map::new()).await.unwrap();
    assert_eq!(text_of(&result.content), ["boom"]);
    assert!(result.is_error);

    let err = client.call_tool("nope", Map::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rpc);
    assert_eq!(err.code(), Some(-32602));

    client.shutdown().await;
}

#[tokio::test]
async fn test_answers_ping() {
    let client = McpClient::connect(&fake_server("fake")).await.unwrap();

    let result = client.call_tool("ping_me", Map::new()).await.unwrap();
    assert_eq!(text_of(&result.content), ["pong-ok"]);

    client.shutdown().await;
}

#[tokio::test]
async fn test_request_timeout() {
    let mut client = McpClient::connect(&fake_server("fake")).await.unwrap();
    client.set_request_timeout(Duration::from_millis(200));

    let err = client.call_tool("hang", Map::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    // The connection is still usable afterwards.
    let result = client.call_tool("echo", Map::new()).await.unwrap();
    assert_eq!(text_of(&result.content), ["hello from fake"]);

    client.shutdown().await;
}

#[tokio::test]
async fn test_server_exit_fails_pending_calls() {
    let client = McpClient::connect(&fake_server("fake")).await.unwrap();

    let err = client.call_tool("crash", Map::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionClosed);

    let err = client.call_tool("echo", Map::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionClosed);
}

#[tokio::test]
async fn test_calls_after_shutdown_fail() {
    let client = McpClient::connect(&fake_server("fake")).await.unwrap();
    client.shutdown().await;

    let err = client.call_tool("echo", Map::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionClosed);
}

#[tokio::test]
async fn test_start_servers() {
    let servers = McpServers::start(vec![fake_server("a"), fake_server("b")])
        .await
        .unwrap();
    let names: Vec<_> =
        servers.servers().iter().map(|s| s.client().name()).collect();
    assert_eq!(names, ["a", "b"]);
    assert_eq!(servers.servers()[1].tools().len(), 2);
    servers.shutdown().await;
}

#[tokio::test]
async fn test_start_servers_is_all_or_nothing() {
    let missing = ServerDescriptor::new(
        "missing",
        "/nonexistent/mcp-server",
        Vec::<String>::new(),
    );
    let err = McpServers::start(vec![fake_server("a"), missing])
        .await
        .err()
        .unwrap();
    assert_eq!(err.server(), "missing");
    assert_eq!(err.error().kind(), ErrorKind::Spawn);
    assert_eq!(err.to_string(), "failed to start MCP server `missing`");
}
