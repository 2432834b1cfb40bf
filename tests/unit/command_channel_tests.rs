//! Unit tests for request/response exchanges on a command connection.

use serde::Deserialize;
use serde_json::{json, Value};

use dsf_client::models::code::{Code, CodeChannel, MessageType};
use dsf_client::models::commands::{AccessLevel, HttpEndpointType, SessionType};
use dsf_client::{AppError, ClientConfig, CommandChannel, CommandConnection};

use super::scripted_transport::{
    deliver, expect, fail, handshake, ok, scripted, ScriptedTransport, Step, TransportRecorder,
};

fn connect(steps: Vec<Step>) -> (CommandConnection<ScriptedTransport>, TransportRecorder) {
    let mut script = handshake("command");
    script.extend(steps);
    let (transport, recorder) = scripted(script);
    let conn = CommandConnection::establish(transport, &ClientConfig::default())
        .expect("handshake must succeed");
    (conn, recorder)
}

/// Frames the client wrote after its init message.
fn sent_commands(recorder: &TransportRecorder) -> Vec<Value> {
    recorder.frames().into_iter().skip(1).collect()
}

// ── Ordering ────────────────────────────────────────────────────────────────

/// Responses pair with requests strictly in order, including when the
/// second response arrives in the same read as the first.
#[test]
fn responses_are_matched_in_request_order() {
    let (mut conn, recorder) = connect(vec![
        expect(r#""command":"GetObjectModel""#),
        deliver(concat!(
            r#"{"success":true,"result":{"state":{"status":"idle"}}}"#,
            r#"{"success":true,"result":"/opt/dsf/sd/sys/config.g"}"#,
        )),
    ]);

    let model: Value = conn.get_object_model().expect("first response");
    let path = conn.resolve_path("0:/sys/config.g").expect("second response");

    assert_eq!(model, json!({ "state": { "status": "idle" } }));
    assert_eq!(path, "/opt/dsf/sd/sys/config.g");
    assert_eq!(
        sent_commands(&recorder),
        vec![
            json!({ "command": "GetObjectModel" }),
            json!({ "command": "ResolvePath", "path": "0:/sys/config.g" }),
        ]
    );
}

// ── Failures ────────────────────────────────────────────────────────────────

/// A canceled task maps to `TaskCanceled`, and the connection stays usable.
#[test]
fn task_canceled_is_distinguished_and_recoverable() {
    let (mut conn, _recorder) = connect(vec![
        expect(r#""command":"Flush""#),
        fail("TaskCanceledException", "A task was canceled."),
        expect(r#""command":"SyncObjectModel""#),
        ok(&Value::Null),
    ]);

    match conn.flush(CodeChannel::File) {
        Err(AppError::TaskCanceled(msg)) => assert_eq!(msg, "A task was canceled."),
        other => panic!("expected TaskCanceled, got: {other:?}"),
    }
    assert!(conn.is_open());
    conn.sync_object_model().expect("connection still usable");
}

/// Any other failure carries the command and the server's error unchanged.
#[test]
fn server_fault_carries_command_and_error() {
    let (mut conn, _recorder) = connect(vec![
        expect(r#""command":"SimpleCode""#),
        fail("InvalidOperationException", "Invalid code channel"),
    ]);

    let err = conn
        .perform_simple_code("M999", CodeChannel::Sbc)
        .expect_err("server reported failure");

    assert_eq!(
        err.to_string(),
        "server fault: InvalidOperationException: Invalid code channel"
    );
    match err {
        AppError::ServerFault {
            command,
            error_type,
            error_message,
        } => {
            assert_eq!(
                command,
                json!({ "command": "SimpleCode", "code": "M999", "channel": "SBC" })
            );
            assert_eq!(error_type, "InvalidOperationException");
            assert_eq!(error_message, "Invalid code channel");
        }
        other => panic!("expected ServerFault, got: {other:?}"),
    }
    assert!(conn.is_open());
}

/// A result of the wrong shape is a decoding error; the response is consumed.
#[test]
fn unexpected_result_shape_is_a_json_error() {
    let (mut conn, _recorder) = connect(vec![
        expect(r#""command":"RemoveUserSession""#),
        ok(&json!("yes")),
        expect(r#""command":"UnlockObjectModel""#),
        ok(&Value::Null),
    ]);

    match conn.remove_user_session(4) {
        Err(AppError::Json(msg)) => assert!(msg.contains("unexpected result shape"), "got: {msg}"),
        other => panic!("expected Json, got: {other:?}"),
    }
    conn.unlock_object_model().expect("next exchange still aligned");
}

// ── Typed results ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, PartialEq)]
struct MachineState {
    status: String,
    #[serde(rename = "upTime")]
    up_time: u64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Model {
    state: MachineState,
}

/// The object model decodes into a caller-supplied type.
#[test]
fn object_model_decodes_into_caller_type() {
    let (mut conn, _recorder) = connect(vec![
        expect(r#""command":"GetObjectModel""#),
        ok(&json!({ "state": { "status": "processing", "upTime": 311 }, "boards": [] })),
    ]);

    let model: Model = conn.get_object_model().expect("typed model");
    assert_eq!(model.state.status, "processing");
    assert_eq!(model.state.up_time, 311);
}

/// The serialized object model is the result re-emitted as text.
#[test]
fn serialized_object_model_is_json_text() {
    let (mut conn, _recorder) = connect(vec![
        expect(r#""command":"GetObjectModel""#),
        ok(&json!({ "job": { "file": null } })),
    ]);

    let text = conn.get_serialized_object_model().expect("model text");
    let parsed: Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(parsed, json!({ "job": { "file": null } }));
}

/// The serialized model is rebuilt from the decoded result, so keys are
/// sorted instead of kept in server order.
#[test]
fn serialized_object_model_sorts_keys() {
    let (mut conn, _recorder) = connect(vec![
        expect(r#""command":"GetObjectModel""#),
        deliver(r#"{"success":true,"result":{"state":{},"boards":[],"job":{}}}"#),
    ]);

    let text = conn.get_serialized_object_model().expect("model text");
    assert_eq!(text, r#"{"boards":[],"job":{},"state":{}}"#);
}

/// Commands without a result decode from a response that has none.
#[test]
fn missing_result_decodes_as_unit() {
    let (mut conn, _recorder) = connect(vec![
        expect(r#""command":"LockObjectModel""#),
        deliver(r#"{"success":true}"#),
    ]);

    conn.lock_object_model().expect("unit result");
}

/// Code execution with no output yields an empty string.
#[test]
fn null_code_output_is_empty() {
    let (mut conn, _recorder) = connect(vec![
        expect(r#""command":"SimpleCode""#),
        ok(&Value::Null),
        expect(r#""command":"SimpleCode""#),
        ok(&json!("FIRMWARE_NAME: RepRapFirmware\n")),
    ]);

    assert_eq!(conn.perform_simple_code("G28", CodeChannel::Sbc).expect("G28"), "");
    assert_eq!(
        conn.perform_simple_code("M115", CodeChannel::Sbc).expect("M115"),
        "FIRMWARE_NAME: RepRapFirmware\n"
    );
}

// ── Wire shapes ─────────────────────────────────────────────────────────────

/// An intercepted code sent back for execution keeps its extra fields but
/// carries a single command tag.
#[test]
fn perform_code_sends_one_command_tag() {
    let (mut conn, recorder) = connect(vec![
        expect(r#""command":"Code""#),
        ok(&json!("ok\n")),
    ]);
    let code: Code = serde_json::from_value(json!({
        "command": "Code",
        "channel": "File",
        "type": "M",
        "majorNumber": 106,
        "parameters": [{ "letter": "S", "value": 0.5 }],
        "lineNumber": 12
    }))
    .expect("code json");

    assert_eq!(conn.perform_code(&code).expect("executed"), "ok\n");

    let sent = recorder.written();
    assert_eq!(sent.matches(r#""command":"#).count(), 1, "sent: {sent}");
    let frame = &sent_commands(&recorder)[0];
    assert_eq!(frame["command"], "Code");
    assert_eq!(frame["channel"], "File");
    assert_eq!(frame["majorNumber"], 106);
    assert_eq!(frame["lineNumber"], 12);
}

/// Helper commands serialize their arguments with the server's field names.
#[test]
fn helper_commands_use_wire_field_names() {
    let (mut conn, recorder) = connect(vec![
        expect(r#""command":"AddHttpEndpoint""#),
        ok(&json!("/run/dsf/machine/custom/status.sock")),
        expect(r#""command":"AddUserSession""#),
        ok(&json!(3)),
        expect(r#""command":"WriteMessage""#),
        ok(&Value::Null),
        expect(r#""command":"SetPluginData""#),
        ok(&Value::Null),
        expect(r#""command":"SetObjectModel""#),
        ok(&json!(true)),
    ]);

    let socket = conn
        .add_http_endpoint(HttpEndpointType::Get, "custom", "status", false)
        .expect("endpoint");
    assert_eq!(socket, "/run/dsf/machine/custom/status.sock");

    let session = conn
        .add_user_session(AccessLevel::ReadWrite, SessionType::Http, "10.0.0.2", None)
        .expect("session");
    assert_eq!(session, 3);

    conn.write_message(MessageType::Warning, "nozzle cold", true, false)
        .expect("message");
    conn.set_plugin_data("Monitor", "interval", json!(5))
        .expect("plugin data");
    assert!(conn.set_object_model("state.beep.frequency", "440").expect("set"));

    let sent = sent_commands(&recorder);
    assert_eq!(
        sent[0],
        json!({
            "command": "AddHttpEndpoint",
            "endpointType": "GET",
            "namespace": "custom",
            "path": "status",
            "isUploadRequest": false
        })
    );
    assert_eq!(sent[1]["accessLevel"], "ReadWrite");
    assert_eq!(sent[1]["sessionType"], "HTTP");
    assert_eq!(sent[1]["origin"], "10.0.0.2");
    assert_eq!(sent[1]["originPort"], std::process::id());
    assert_eq!(
        sent[2],
        json!({
            "command": "WriteMessage",
            "type": 1,
            "content": "nozzle cold",
            "outputMessage": true,
            "logMessage": false
        })
    );
    assert_eq!(
        sent[3],
        json!({ "command": "SetPluginData", "plugin": "Monitor", "key": "interval", "value": 5 })
    );
    assert_eq!(sent[4]["propertyPath"], "state.beep.frequency");
    assert_eq!(sent[4]["value"], "440");
}

/// The raw connection can send arbitrary commands.
#[test]
fn raw_connection_performs_untyped_commands() {
    let (conn, recorder) = connect(vec![
        expect(r#""command":"GetMachineModel""#),
        ok(&json!({ "network": {} })),
    ]);
    let mut raw = conn.into_inner();

    let result: Value = raw
        .perform_command(&json!({ "command": "GetMachineModel" }))
        .expect("raw command");
    assert_eq!(result, json!({ "network": {} }));
    assert_eq!(sent_commands(&recorder), vec![json!({ "command": "GetMachineModel" })]);
}
