//! Shared fixtures for integration tests.
//!
//! [`spawn_server`] binds a real local socket in a temporary directory and
//! runs a scripted control server for exactly one client on a background
//! thread. The script talks to the client through [`ServerSide`], which
//! records every frame in order so tests can check the interleaving of both
//! directions afterwards.

use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use interprocess::local_socket::{
    traits::Listener as _, GenericFilePath, ListenerOptions, Stream, ToFsName,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use dsf_client::framing::reader::FrameReader;
use dsf_client::framing::writer::{encode_frame, write_frame};
use dsf_client::ClientConfig;

/// One frame observed by the fake server.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Frame the server wrote.
    Sent(Value),
    /// Frame the server read from the client.
    Received(Value),
    /// The client closed its end.
    ClientClosed,
}

/// Server end of one accepted connection.
pub struct ServerSide {
    stream: Stream,
    reader: FrameReader,
    events: Vec<Event>,
}

impl ServerSide {
    /// Write `value` as one frame.
    pub fn send(&mut self, value: Value) {
        let frame = encode_frame(&value).expect("server frames are objects");
        write_frame(&mut self.stream, frame).expect("server write");
        self.events.push(Event::Sent(value));
    }

    /// Read the next frame, or `None` once the client has closed.
    pub fn recv(&mut self) -> Option<Value> {
        match self.reader.read_frame(&mut self.stream) {
            Ok(frame) => {
                let value: Value = serde_json::from_str(&frame).expect("client sent json");
                self.events.push(Event::Received(value.clone()));
                Some(value)
            }
            Err(_) => {
                self.events.push(Event::ClientClosed);
                None
            }
        }
    }

    /// Read the next frame and require it to be `command`.
    pub fn expect_command(&mut self, command: &str) -> Value {
        let frame = self.recv().expect("client closed early");
        assert_eq!(frame["command"], command, "unexpected frame: {frame}");
        frame
    }

    /// Greet the client with protocol `version`.
    pub fn greet(&mut self, version: u32) {
        self.send(json!({ "version": version, "id": 7 }));
    }

    /// Run a successful handshake and return the client's init message.
    pub fn accept(&mut self, mode: &str) -> Value {
        self.greet(12);
        let init = self.recv().expect("init message");
        assert_eq!(init["mode"], mode, "unexpected init: {init}");
        self.ok(Value::Null);
        init
    }

    /// Successful response carrying `result`.
    pub fn ok(&mut self, result: Value) {
        self.send(json!({ "success": true, "result": result }));
    }

    /// Failed response.
    pub fn fail(&mut self, error_type: &str, error_message: &str) {
        self.send(json!({
            "success": false,
            "errorType": error_type,
            "errorMessage": error_message
        }));
    }
}

/// Scripted server bound to a temporary socket.
pub struct FakeServer {
    /// Client configuration pointing at the server's socket.
    pub config: ClientConfig,
    handle: JoinHandle<Vec<Event>>,
    _dir: TempDir,
}

impl FakeServer {
    /// Wait for the script to finish and return what the server observed.
    pub fn finish(self) -> Vec<Event> {
        self.handle.join().expect("server script panicked")
    }
}

/// Bind a socket, then accept one client and run `script` against it.
pub fn spawn_server<F>(script: F) -> FakeServer
where
    F: FnOnce(&mut ServerSide) + Send + 'static,
{
    let dir = tempfile::tempdir().expect("temp dir");
    let path: PathBuf = dir.path().join("dcs.sock");
    let name = path
        .clone()
        .to_fs_name::<GenericFilePath>()
        .expect("socket name");
    let listener = ListenerOptions::new()
        .name(name)
        .create_sync()
        .expect("bind socket");

    let handle = thread::spawn(move || {
        let stream = listener.accept().expect("accept client");
        let mut side = ServerSide {
            stream,
            reader: FrameReader::new(1024, None),
            events: Vec::new(),
        };
        script(&mut side);
        side.events
    });

    FakeServer {
        config: ClientConfig::with_socket_path(path),
        handle,
        _dir: dir,
    }
}

/// Frames the server received, in order.
pub fn received(events: &[Event]) -> Vec<Value> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Received(value) => Some(value.clone()),
            _ => None,
        })
        .collect()
}
