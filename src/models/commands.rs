//! Outbound command payloads.
//!
//! Every request is a JSON object tagged with a `command` field carrying the
//! command name; remaining fields are camelCase. The protocol engine treats
//! these as opaque serializable values; the enum only saves callers from
//! spelling field names by hand.

use serde::Serialize;
use serde_json::Value;

use super::code::{Code, CodeChannel, MessageType};

/// HTTP method (or WebSocket) of a third-party endpoint.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpEndpointType {
    /// `GET` request.
    Get,
    /// `POST` request.
    Post,
    /// `PUT` request.
    Put,
    /// `PATCH` request.
    Patch,
    /// `TRACE` request.
    Trace,
    /// `DELETE` request.
    Delete,
    /// `OPTIONS` request.
    Options,
    /// WebSocket upgrade.
    #[serde(rename = "WebSocket")]
    WebSocket,
}

/// Access level granted to a user session.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum AccessLevel {
    /// May read the object model only.
    ReadOnly,
    /// May change machine state.
    ReadWrite,
}

/// Origin type of a user session.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum SessionType {
    /// Local client on the same machine.
    Local,
    /// Remote client through the web server.
    #[serde(rename = "HTTP")]
    Http,
    /// Remote client through Telnet.
    Telnet,
}

/// Request sent on a command-mode connection (or a resolution sent while
/// intercepting, or an acknowledgment while subscribed).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "command", rename_all_fields = "camelCase")]
pub enum Command {
    /// Wait for all pending codes of a channel to finish.
    Flush {
        /// Channel to flush.
        channel: CodeChannel,
    },
    /// Retrieve the full object model.
    GetObjectModel,
    /// Lock the object model for writing.
    LockObjectModel,
    /// Release a lock taken with [`Command::LockObjectModel`].
    UnlockObjectModel,
    /// Set one object model property; the model must be locked.
    SetObjectModel {
        /// Dotted path of the property.
        property_path: String,
        /// New value as text.
        value: String,
    },
    /// Apply a patch below one object model key.
    PatchObjectModel {
        /// Top-level key to patch.
        key: String,
        /// Patch document.
        patch: Value,
    },
    /// Wait for the object model to be refreshed from the firmware.
    SyncObjectModel,
    /// Execute a pre-parsed code.
    Code(Code),
    /// Execute codes given as text.
    SimpleCode {
        /// Code text, possibly several lines.
        code: String,
        /// Channel to execute on.
        channel: CodeChannel,
    },
    /// Resolve a firmware-style path to a filesystem path.
    ResolvePath {
        /// Firmware-style path.
        path: String,
    },
    /// Parse a job file and return its metadata.
    GetFileInfo {
        /// Firmware-style path of the file.
        file_name: String,
    },
    /// Install or upgrade a plugin from a bundle.
    InstallPlugin {
        /// Absolute path of the plugin bundle.
        plugin_file: String,
    },
    /// Start a plugin.
    StartPlugin {
        /// Plugin name.
        plugin: String,
    },
    /// Stop a plugin.
    StopPlugin {
        /// Plugin name.
        plugin: String,
    },
    /// Uninstall a plugin.
    UninstallPlugin {
        /// Plugin name.
        plugin: String,
    },
    /// Store custom plugin data in the object model.
    SetPluginData {
        /// Plugin name.
        plugin: String,
        /// Data key.
        key: String,
        /// Data value.
        value: Value,
    },
    /// Register a third-party HTTP endpoint under `/machine/{namespace}/{path}`.
    AddHttpEndpoint {
        /// HTTP method.
        endpoint_type: HttpEndpointType,
        /// Endpoint namespace.
        namespace: String,
        /// Endpoint path.
        path: String,
        /// Whether the request body is streamed as a file upload.
        is_upload_request: bool,
    },
    /// Remove a registered HTTP endpoint.
    RemoveHttpEndpoint {
        /// HTTP method.
        endpoint_type: HttpEndpointType,
        /// Endpoint namespace.
        namespace: String,
        /// Endpoint path.
        path: String,
    },
    /// Register a user session.
    AddUserSession {
        /// Granted access level.
        access_level: AccessLevel,
        /// Origin type.
        session_type: SessionType,
        /// Origin address.
        origin: String,
        /// Origin port, or the client's process id for local sessions.
        origin_port: u32,
    },
    /// Remove a user session.
    RemoveUserSession {
        /// Session identifier returned by [`Command::AddUserSession`].
        id: i64,
    },
    /// Write a message to the console and/or the log.
    WriteMessage {
        /// Message severity.
        #[serde(rename = "type")]
        message_type: MessageType,
        /// Message text.
        content: String,
        /// Show the message on the console.
        output_message: bool,
        /// Write the message to the log file.
        log_message: bool,
    },
    /// Flag that a software update is in progress.
    SetUpdateStatus {
        /// Whether an update is running.
        updating: bool,
    },
    /// Cancel the intercepted code.
    Cancel,
    /// Let the intercepted code continue unchanged.
    Ignore,
    /// Resolve the intercepted code with a message.
    Resolve {
        /// Message severity.
        #[serde(rename = "type")]
        message_type: MessageType,
        /// Message text, if any.
        content: Option<String>,
    },
    /// Acknowledge a subscription payload.
    Acknowledge,
}

impl Command {
    /// Wire name of the command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flush { .. } => "Flush",
            Self::GetObjectModel => "GetObjectModel",
            Self::LockObjectModel => "LockObjectModel",
            Self::UnlockObjectModel => "UnlockObjectModel",
            Self::SetObjectModel { .. } => "SetObjectModel",
            Self::PatchObjectModel { .. } => "PatchObjectModel",
            Self::SyncObjectModel => "SyncObjectModel",
            Self::Code(_) => "Code",
            Self::SimpleCode { .. } => "SimpleCode",
            Self::ResolvePath { .. } => "ResolvePath",
            Self::GetFileInfo { .. } => "GetFileInfo",
            Self::InstallPlugin { .. } => "InstallPlugin",
            Self::StartPlugin { .. } => "StartPlugin",
            Self::StopPlugin { .. } => "StopPlugin",
            Self::UninstallPlugin { .. } => "UninstallPlugin",
            Self::SetPluginData { .. } => "SetPluginData",
            Self::AddHttpEndpoint { .. } => "AddHttpEndpoint",
            Self::RemoveHttpEndpoint { .. } => "RemoveHttpEndpoint",
            Self::AddUserSession { .. } => "AddUserSession",
            Self::RemoveUserSession { .. } => "RemoveUserSession",
            Self::WriteMessage { .. } => "WriteMessage",
            Self::SetUpdateStatus { .. } => "SetUpdateStatus",
            Self::Cancel => "Cancel",
            Self::Ignore => "Ignore",
            Self::Resolve { .. } => "Resolve",
            Self::Acknowledge => "Acknowledge",
        }
    }
}
