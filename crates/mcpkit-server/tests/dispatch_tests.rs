//! Operational routing: tools, resources, prompts, and the notification
//! silence rules.

mod common;

use common::{handshake, notes_server, send_line, RecordingSink};
use mcpkit_core::protocol::RequestId;
use serde_json::json;

#[tokio::test]
async fn test_tools_list_and_call() {
    let (server, _) = notes_server();
    let dispatcher = server.dispatcher();
    let sink = RecordingSink::new();
    handshake(&dispatcher, &sink).await;

    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
    )
    .await;
    let result = sink.last_response().unwrap().result.unwrap();
    let names: Vec<&str> = result["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["add_note", "boom"]);

    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"add_note","arguments":{"text":"milk"}}}"#,
    )
    .await;
    let result = sink.last_response().unwrap().result.unwrap();
    assert_eq!(result["content"][0]["text"], json!("added: milk"));
    assert!(result.get("isError").is_none());
}

#[tokio::test]
async fn test_tool_level_failure_is_a_success_response() {
    let (server, _) = notes_server();
    let dispatcher = server.dispatcher();
    let sink = RecordingSink::new();
    handshake(&dispatcher, &sink).await;

    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"add_note","arguments":{"text":""}}}"#,
    )
    .await;
    let response = sink.last_response().unwrap();
    assert!(response.error.is_none(), "tool failure rides a success frame");
    let result = response.result.unwrap();
    assert_eq!(result["isError"], json!(true));
}

#[tokio::test]
async fn test_unhandled_tool_error_maps_to_internal_error() {
    let (server, _) = notes_server();
    let dispatcher = server.dispatcher();
    let sink = RecordingSink::new();
    handshake(&dispatcher, &sink).await;

    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"boom"}}"#,
    )
    .await;
    let error = sink.last_response().unwrap().error.unwrap();
    assert_eq!(error.code, -32603);
}

#[tokio::test]
async fn test_unknown_tool_and_unknown_method() {
    let (server, _) = notes_server();
    let dispatcher = server.dispatcher();
    let sink = RecordingSink::new();
    handshake(&dispatcher, &sink).await;

    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"nope"}}"#,
    )
    .await;
    let error = sink.last_response().unwrap().error.unwrap();
    assert_eq!(error.code, -32601);
    assert!(error.message.contains("nope"));

    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":6,"method":"no/such/method"}"#,
    )
    .await;
    let error = sink.last_response().unwrap().error.unwrap();
    assert_eq!(error.code, -32601);
}

#[tokio::test]
async fn test_missing_call_params_is_invalid_params() {
    let (server, _) = notes_server();
    let dispatcher = server.dispatcher();
    let sink = RecordingSink::new();
    handshake(&dispatcher, &sink).await;

    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":7,"method":"tools/call"}"#,
    )
    .await;
    assert_eq!(sink.last_response().unwrap().error.unwrap().code, -32602);
}

#[tokio::test]
async fn test_resources_read_from_cache() {
    let (server, store) = notes_server();
    let dispatcher = server.dispatcher();
    let sink = RecordingSink::new();
    handshake(&dispatcher, &sink).await;

    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":8,"method":"resources/read","params":{"uri":"note://notes/welcome"}}"#,
    )
    .await;
    let result = sink.last_response().unwrap().result.unwrap();
    assert_eq!(result["contents"][0]["text"], json!("welcome to notes"));
    assert_eq!(result["contents"][0]["uri"], json!("note://notes/welcome"));

    // A matching pattern but no cached content.
    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":9,"method":"resources/read","params":{"uri":"note://notes/absent"}}"#,
    )
    .await;
    assert_eq!(sink.last_response().unwrap().error.unwrap().code, -32602);

    // No pattern matches this scheme at all.
    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":10,"method":"resources/read","params":{"uri":"file://etc/passwd"}}"#,
    )
    .await;
    assert_eq!(sink.last_response().unwrap().error.unwrap().code, -32602);

    drop(store);
}

#[tokio::test]
async fn test_resources_list_and_subscribe() {
    let (server, _) = notes_server();
    let dispatcher = server.dispatcher();
    let sink = RecordingSink::new();
    handshake(&dispatcher, &sink).await;

    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":11,"method":"resources/list"}"#,
    )
    .await;
    let result = sink.last_response().unwrap().result.unwrap();
    assert_eq!(
        result["resources"][0]["uriPattern"],
        json!("note://notes/**")
    );

    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":12,"method":"resources/subscribe","params":{"uri":"note://notes/welcome"}}"#,
    )
    .await;
    assert!(sink.last_response().unwrap().error.is_none());
    assert!(server
        .registries()
        .resources
        .is_subscribed(&mcpkit_core::utils::Uri::new("note://notes/welcome")));
}

#[tokio::test]
async fn test_prompts_get_with_validation() {
    let (server, _) = notes_server();
    let dispatcher = server.dispatcher();
    let sink = RecordingSink::new();
    handshake(&dispatcher, &sink).await;

    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":13,"method":"prompts/get","params":{"name":"summarize","arguments":{"note_id":"n-1"}}}"#,
    )
    .await;
    let result = sink.last_response().unwrap().result.unwrap();
    assert_eq!(
        result["messages"][0]["content"]["text"],
        json!("Summarize note n-1")
    );

    // Validator failure surfaces as invalid params.
    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":14,"method":"prompts/get","params":{"name":"summarize"}}"#,
    )
    .await;
    let error = sink.last_response().unwrap().error.unwrap();
    assert_eq!(error.code, -32602);
    assert!(error.message.contains("note_id"));

    // Unknown prompt name.
    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":15,"method":"prompts/get","params":{"name":"missing"}}"#,
    )
    .await;
    assert_eq!(sink.last_response().unwrap().error.unwrap().code, -32601);
}

#[tokio::test]
async fn test_notifications_never_produce_responses() {
    let (server, _) = notes_server();
    let dispatcher = server.dispatcher();
    let sink = RecordingSink::new();
    handshake(&dispatcher, &sink).await;
    let before = sink.message_count();

    // Well-formed notification for an unknown method: core fails, silence.
    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","method":"no/such/notification"}"#,
    )
    .await;
    // Malformed cancellation params: core fails, silence.
    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"bogus":true}}"#,
    )
    .await;
    // Progress notifications are observed and dropped.
    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","method":"notifications/progress","params":{"progress":50}}"#,
    )
    .await;

    assert_eq!(sink.message_count(), before);
}

#[tokio::test]
async fn test_cancellation_notification_marks_registry() {
    let (server, _) = notes_server();
    let dispatcher = server.dispatcher();
    let sink = RecordingSink::new();

    // Always allowed, even before the handshake.
    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":42}}"#,
    )
    .await;

    assert!(server.cancellations().is_cancelled(&RequestId::number(42)));
    assert_eq!(sink.message_count(), 0);
}

#[tokio::test]
async fn test_null_id_request_echoes_null() {
    let (server, _) = notes_server();
    let dispatcher = server.dispatcher();
    let sink = RecordingSink::new();

    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#,
    )
    .await;
    let response = sink.last_response().expect("null-id requests are answered");
    assert_eq!(response.id, RequestId::Null);
    assert!(response.error.is_none());
}

#[tokio::test]
async fn test_capability_changes_visible_on_rehandshake() {
    let (server, _) = notes_server();
    let dispatcher = server.dispatcher();
    let sink = RecordingSink::new();
    handshake(&dispatcher, &sink).await;

    // Prompts were registered, so they are advertised; drop them all and
    // re-handshake: the entry disappears.
    server.registries().prompts.clear();
    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":"s","method":"shutdown"}"#,
    )
    .await;
    send_line(
        &dispatcher,
        &sink,
        r#"{"jsonrpc":"2.0","id":"re","method":"initialize","params":{"protocolVersion":"2025-06-18","capabilities":{}}}"#,
    )
    .await;

    let result = sink.last_response().unwrap().result.unwrap();
    assert!(result["capabilities"].get("prompts").is_none());
    assert!(result["capabilities"]["tools"].is_object());
}
