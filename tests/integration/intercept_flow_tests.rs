//! Integration tests for code interception over a real local socket.

use serde_json::json;

use dsf_client::models::code::MessageType;
use dsf_client::models::init::{InterceptOptions, InterceptionMode};
use dsf_client::{CommandChannel, InterceptConnection};

use super::test_helpers::{spawn_server, Event};

/// Codes and resolutions strictly alternate, and commands issued while a
/// code is outstanding are answered before the resolution.
#[test]
fn codes_and_resolutions_alternate() {
    let server = spawn_server(|side| {
        let init = side.accept("intercept");
        assert_eq!(init["interceptionMode"], "Post");
        assert_eq!(init["filters"], json!(["M1234", "G28"]));

        side.send(json!({ "channel": "HTTP", "type": "G", "majorNumber": 28, "parameters": [] }));
        side.expect_command("Ignore");

        side.send(json!({
            "channel": "File",
            "type": "M",
            "majorNumber": 1234,
            "parameters": [{ "letter": "P", "value": "job.g" }]
        }));
        side.expect_command("Flush");
        side.ok(json!(true));
        let resolution = side.expect_command("Resolve");
        assert_eq!(resolution["type"], 0);
        assert_eq!(resolution["content"], "flushed");

        assert!(side.recv().is_none());
    });

    let options = InterceptOptions {
        filters: Some(vec!["M1234".into(), "G28".into()]),
        ..InterceptOptions::new(InterceptionMode::Post)
    };
    let mut conn = InterceptConnection::connect(options, &server.config).expect("connect");

    let first = conn.receive_code().expect("first code");
    assert!(first.is("G", 28));
    conn.ignore_code().expect("ignore");

    let second = conn.receive_code().expect("second code");
    assert_eq!(second.to_string(), "M1234 P\"job.g\"");
    assert!(conn.flush(second.channel).expect("flush while outstanding"));
    conn.resolve_code(MessageType::Success, Some("flushed"))
        .expect("resolve");
    conn.close();

    let events = server.finish();
    let order: Vec<&str> = events
        .iter()
        .skip(3)
        .map(|event| match event {
            Event::Sent(frame) if frame.get("success").is_some() => "response",
            Event::Sent(_) => "code",
            Event::Received(frame) => frame["command"].as_str().unwrap_or("?"),
            Event::ClientClosed => "closed",
        })
        .collect();
    assert_eq!(
        order,
        ["code", "Ignore", "code", "Flush", "response", "Resolve", "closed"]
    );
}
