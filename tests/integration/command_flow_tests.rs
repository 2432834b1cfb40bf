//! Integration tests for command connections over a real local socket.

use serde_json::{json, Value};

use dsf_client::models::code::CodeChannel;
use dsf_client::{AppError, CommandChannel, CommandConnection};

use super::test_helpers::{received, spawn_server, Event};

/// Several commands on one connection are answered in order.
#[test]
fn commands_round_trip_in_order() {
    let server = spawn_server(|side| {
        side.accept("command");

        side.expect_command("GetObjectModel");
        side.ok(json!({ "state": { "status": "idle" } }));

        let code = side.expect_command("SimpleCode");
        assert_eq!(code["code"], "M115");
        side.ok(json!("FIRMWARE_NAME: RepRapFirmware\n"));

        side.expect_command("ResolvePath");
        side.ok(json!("/opt/dsf/sd/gcodes"));

        assert!(side.recv().is_none(), "client should close after its commands");
    });

    let mut conn = CommandConnection::connect(&server.config).expect("connect");
    assert_eq!(conn.id(), "7");

    let model: Value = conn.get_object_model().expect("model");
    assert_eq!(model["state"]["status"], "idle");
    let output = conn
        .perform_simple_code("M115", CodeChannel::Sbc)
        .expect("M115");
    assert!(output.starts_with("FIRMWARE_NAME"));
    assert_eq!(conn.resolve_path("0:/gcodes").expect("path"), "/opt/dsf/sd/gcodes");
    conn.close();

    let events = server.finish();
    let commands: Vec<String> = received(&events)
        .iter()
        .skip(1)
        .map(|frame| frame["command"].as_str().unwrap_or_default().to_owned())
        .collect();
    assert_eq!(commands, ["GetObjectModel", "SimpleCode", "ResolvePath"]);
    assert_eq!(events.last(), Some(&Event::ClientClosed));
}

/// Server-side failures come back as typed errors and the connection
/// survives them.
#[test]
fn server_failures_are_typed_and_recoverable() {
    let server = spawn_server(|side| {
        side.accept("command");

        side.expect_command("Flush");
        side.fail("TaskCanceledException", "A task was canceled.");

        side.expect_command("StartPlugin");
        side.fail("ArgumentException", "Plugin Monitor not found");

        side.expect_command("Flush");
        side.ok(json!(true));
    });

    let mut conn = CommandConnection::connect(&server.config).expect("connect");

    assert!(matches!(
        conn.flush(CodeChannel::File),
        Err(AppError::TaskCanceled(_))
    ));
    match conn.start_plugin("Monitor") {
        Err(AppError::ServerFault {
            command,
            error_message,
            ..
        }) => {
            assert_eq!(command, json!({ "command": "StartPlugin", "plugin": "Monitor" }));
            assert_eq!(error_message, "Plugin Monitor not found");
        }
        other => panic!("expected ServerFault, got: {other:?}"),
    }
    assert!(conn.flush(CodeChannel::File).expect("third exchange"));

    server.finish();
}

/// The server going away mid-request closes the client connection.
#[test]
fn server_disconnect_surfaces_as_closed() {
    let server = spawn_server(|side| {
        side.accept("command");
        side.expect_command("SyncObjectModel");
    });

    let mut conn = CommandConnection::connect(&server.config).expect("connect");
    let err = conn.sync_object_model().expect_err("server hung up");

    assert!(matches!(err, AppError::Closed(_)), "got: {err:?}");
    assert!(!conn.is_open());
    server.finish();
}
