//! End-to-end lifecycle tests against a scripted fake tool server.
//!
//! The fake server is a tiny `sh` loop that reads request lines and answers
//! by request id. Request ids are deterministic (1, 2, 3, …) because each
//! transport numbers its requests from 1, so a static script is enough to
//! exercise the handshake, discovery, invocation, and teardown paths.

use quill_mcp::{ConnectionManager, ConnectionState, ServerConfig};
use std::sync::Arc;
use std::time::Duration;

fn scripted_server(responses: &[&str]) -> ServerConfig {
    let mut script = String::from("while IFS= read -r line; do\ncase \"$line\" in\n");
    for (i, resp) in responses.iter().enumerate() {
        let id = i + 1;
        script.push_str(&format!("*'\"id\":{id},'*) printf '%s\\n' '{resp}' ;;\n"));
    }
    script.push_str("esac\ndone\n");
    ServerConfig {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script],
        env: Default::default(),
        timeout_ms: 5000,
        transport: Default::default(),
    }
}

const INIT_OK: &str = r#"{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"fake","version":"0.0.0"}}}"#;

#[tokio::test]
async fn connect_reaches_ready_and_publishes_a_session() {
    let manager = ConnectionManager::new();
    let conn = manager.connect("fake", scripted_server(&[INIT_OK])).await;
    assert_eq!(conn.state(), ConnectionState::Ready);

    let session = manager.get_session("fake").await.expect("session");
    assert_eq!(session.server_name(), "fake");
    assert_eq!(manager.directory().len(), 1);

    manager.disconnect_all().await;
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(manager.directory().is_empty());
    assert!(manager.get_session("fake").await.is_none());
}

#[tokio::test]
async fn list_operations_and_invoke_round_trip() {
    let tools = r#"{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"lookup","description":"Look things up","inputSchema":{"type":"object","properties":{"id":{"type":"integer","description":"Record id"}},"required":["id"]}}]}}"#;
    let call = r#"{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"record 1"}],"isError":false}}"#;

    let manager = ConnectionManager::new();
    manager
        .connect("fake", scripted_server(&[INIT_OK, tools, call]))
        .await;

    let session = manager.get_session("fake").await.expect("session");
    let ops = session.list_operations().await.expect("tools/list");
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].name, "lookup");
    assert_eq!(ops[0].description, "Look things up");
    assert_eq!(ops[0].input_schema["required"][0], "id");

    let result = session
        .invoke("lookup", serde_json::json!({"id": 1}))
        .await
        .expect("tools/call");
    assert_eq!(result["content"][0]["text"], "record 1");

    manager.disconnect_all().await;
}

#[tokio::test]
async fn rpc_error_from_invoke_surfaces_as_error() {
    let bad_call =
        r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32602,"message":"missing argument"}}"#;

    let manager = ConnectionManager::new();
    manager
        .connect("fake", scripted_server(&[INIT_OK, bad_call]))
        .await;

    let session = manager.get_session("fake").await.expect("session");
    let err = session
        .invoke("lookup", serde_json::json!({}))
        .await
        .expect_err("rpc error");
    let text = err.to_string();
    assert!(text.contains("-32602"), "unexpected error: {text}");
    assert!(text.contains("missing argument"), "unexpected error: {text}");

    manager.disconnect_all().await;
}

#[tokio::test]
async fn disconnect_cancels_a_stalled_initialization() {
    // Never answers the handshake; initialization stays in flight until the
    // teardown request cancels it.
    let stalled = ServerConfig {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), "cat >/dev/null".to_string()],
        env: Default::default(),
        timeout_ms: 30_000,
        transport: Default::default(),
    };

    let manager = Arc::new(ConnectionManager::new());
    let connecting = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.connect("stalled", stalled).await })
    };

    // Give the connection time to enter Initializing before tearing down.
    tokio::time::sleep(Duration::from_millis(100)).await;
    manager.disconnect("stalled").await;

    let conn = connecting.await.expect("connect task");
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(conn.session().is_none());
    assert!(manager.directory().is_empty());
}

#[tokio::test]
async fn independent_connections_do_not_wait_on_each_other() {
    let manager = Arc::new(ConnectionManager::new());

    // One server stalls forever; the other comes up normally.
    let stalled = ServerConfig {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), "cat >/dev/null".to_string()],
        env: Default::default(),
        timeout_ms: 30_000,
        transport: Default::default(),
    };
    let stalling = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.connect("stalled", stalled).await })
    };

    let healthy = tokio::time::timeout(
        Duration::from_secs(5),
        manager.connect("fake", scripted_server(&[INIT_OK])),
    )
    .await
    .expect("healthy connect must not wait on the stalled server");
    assert_eq!(healthy.state(), ConnectionState::Ready);

    manager.disconnect_all().await;
    let stalled_conn = stalling.await.expect("connect task");
    assert_eq!(stalled_conn.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn env_overlay_reaches_the_server_process() {
    // The script replies to the handshake with a value taken from its
    // environment, proving the overlay was merged in.
    let script = concat!(
        "while IFS= read -r line; do\n",
        "case \"$line\" in\n",
        "*'\"id\":1,'*) printf '%s\\n' '{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}' ;;\n",
        "*'\"id\":2,'*) printf '%s\\n' \"{\\\"jsonrpc\\\":\\\"2.0\\\",\\\"id\\\":2,\\\"result\\\":{\\\"tools\\\":[{\\\"name\\\":\\\"$QUILL_TEST_TOOL\\\"}]}}\" ;;\n",
        "esac\ndone\n",
    );
    let mut config = ServerConfig {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        env: Default::default(),
        timeout_ms: 5000,
        transport: Default::default(),
    };
    config
        .env
        .insert("QUILL_TEST_TOOL".to_string(), "from-env".to_string());

    let manager = ConnectionManager::new();
    manager.connect("envy", config).await;
    let session = manager.get_session("envy").await.expect("session");
    let ops = session.list_operations().await.expect("tools/list");
    assert_eq!(ops[0].name, "from-env");

    manager.disconnect_all().await;
}
