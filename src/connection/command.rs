//! Command channel.
//!
//! [`CommandChannel`] is the request/response seam: implementors provide
//! [`CommandChannel::perform_command`] and get typed helpers for every
//! command the server understands. [`CommandConnection`] implements it on a
//! connection opened in command mode;
//! [`InterceptConnection`](super::intercept::InterceptConnection) implements
//! it while a code is awaiting resolution.

use interprocess::local_socket::Stream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{Connection, Transport};
use crate::config::ClientConfig;
use crate::models::code::{Code, CodeChannel, MessageType};
use crate::models::commands::{AccessLevel, Command, HttpEndpointType, SessionType};
use crate::models::init::ClientInitMessage;
use crate::Result;

/// Typed request/response operations over one connection.
pub trait CommandChannel {
    /// Send `command` and decode the single response into `R`.
    ///
    /// `R = serde_json::Value` returns the raw result.
    ///
    /// # Errors
    ///
    /// - `AppError::TaskCanceled` if the server canceled the task.
    /// - `AppError::ServerFault` for any other unsuccessful response.
    /// - Transport, framing, and decoding errors of the underlying
    ///   connection.
    fn perform_command<R, S>(&mut self, command: &S) -> Result<R>
    where
        R: DeserializeOwned,
        S: Serialize + ?Sized;

    /// Wait for all pending codes of `channel` to finish.
    ///
    /// Returns `false` if the codes were canceled instead.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn flush(&mut self, channel: CodeChannel) -> Result<bool> {
        self.perform_command(&Command::Flush { channel })
    }

    /// Retrieve the full object model decoded into `M`.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn get_object_model<M: DeserializeOwned>(&mut self) -> Result<M> {
        self.perform_command(&Command::GetObjectModel)
    }

    /// Retrieve the full object model as JSON text.
    ///
    /// The text is re-serialized from the decoded result, so object keys come
    /// back sorted rather than in the order the server sent them.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn get_serialized_object_model(&mut self) -> Result<String> {
        let model: Value = self.perform_command(&Command::GetObjectModel)?;
        Ok(model.to_string())
    }

    /// Lock the object model for writing. Pair with
    /// [`CommandChannel::unlock_object_model`].
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn lock_object_model(&mut self) -> Result<()> {
        self.perform_command(&Command::LockObjectModel)
    }

    /// Release the object model lock.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn unlock_object_model(&mut self) -> Result<()> {
        self.perform_command(&Command::UnlockObjectModel)
    }

    /// Set one object model property. Lock the model first.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn set_object_model(&mut self, property_path: &str, value: &str) -> Result<bool> {
        self.perform_command(&Command::SetObjectModel {
            property_path: property_path.to_owned(),
            value: value.to_owned(),
        })
    }

    /// Apply `patch` below the top-level object model `key`.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn patch_object_model(&mut self, key: &str, patch: Value) -> Result<()> {
        self.perform_command(&Command::PatchObjectModel {
            key: key.to_owned(),
            patch,
        })
    }

    /// Wait until the object model has been refreshed from the firmware.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn sync_object_model(&mut self) -> Result<()> {
        self.perform_command(&Command::SyncObjectModel)
    }

    /// Execute a pre-parsed code and return its output.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn perform_code(&mut self, code: &Code) -> Result<String> {
        let mut code = code.clone();
        // An intercepted code may echo its own tag.
        code.extra.remove("command");
        let output: Option<String> = self.perform_command(&Command::Code(code))?;
        Ok(output.unwrap_or_default())
    }

    /// Execute codes given as text on `channel` and return their output.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn perform_simple_code(&mut self, code: &str, channel: CodeChannel) -> Result<String> {
        let output: Option<String> = self.perform_command(&Command::SimpleCode {
            code: code.to_owned(),
            channel,
        })?;
        Ok(output.unwrap_or_default())
    }

    /// Resolve a firmware-style path such as `0:/sys/config.g`.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn resolve_path(&mut self, path: &str) -> Result<String> {
        self.perform_command(&Command::ResolvePath {
            path: path.to_owned(),
        })
    }

    /// Parse a job file and decode its metadata into `F`.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn get_file_info<F: DeserializeOwned>(&mut self, file_name: &str) -> Result<F> {
        self.perform_command(&Command::GetFileInfo {
            file_name: file_name.to_owned(),
        })
    }

    /// Install or upgrade a plugin from the bundle at `plugin_file`.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn install_plugin(&mut self, plugin_file: &str) -> Result<()> {
        self.perform_command(&Command::InstallPlugin {
            plugin_file: plugin_file.to_owned(),
        })
    }

    /// Start a plugin.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn start_plugin(&mut self, plugin: &str) -> Result<()> {
        self.perform_command(&Command::StartPlugin {
            plugin: plugin.to_owned(),
        })
    }

    /// Stop a plugin.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn stop_plugin(&mut self, plugin: &str) -> Result<()> {
        self.perform_command(&Command::StopPlugin {
            plugin: plugin.to_owned(),
        })
    }

    /// Uninstall a plugin.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn uninstall_plugin(&mut self, plugin: &str) -> Result<()> {
        self.perform_command(&Command::UninstallPlugin {
            plugin: plugin.to_owned(),
        })
    }

    /// Store custom data for `plugin` in the object model.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn set_plugin_data(&mut self, plugin: &str, key: &str, value: Value) -> Result<()> {
        self.perform_command(&Command::SetPluginData {
            plugin: plugin.to_owned(),
            key: key.to_owned(),
            value,
        })
    }

    /// Register an HTTP endpoint and return the socket path requests are
    /// forwarded to.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn add_http_endpoint(
        &mut self,
        endpoint_type: HttpEndpointType,
        namespace: &str,
        path: &str,
        is_upload_request: bool,
    ) -> Result<String> {
        self.perform_command(&Command::AddHttpEndpoint {
            endpoint_type,
            namespace: namespace.to_owned(),
            path: path.to_owned(),
            is_upload_request,
        })
    }

    /// Remove a registered HTTP endpoint.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn remove_http_endpoint(
        &mut self,
        endpoint_type: HttpEndpointType,
        namespace: &str,
        path: &str,
    ) -> Result<bool> {
        self.perform_command(&Command::RemoveHttpEndpoint {
            endpoint_type,
            namespace: namespace.to_owned(),
            path: path.to_owned(),
        })
    }

    /// Register a user session and return its identifier.
    ///
    /// `origin_port` defaults to this process's id.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn add_user_session(
        &mut self,
        access_level: AccessLevel,
        session_type: SessionType,
        origin: &str,
        origin_port: Option<u32>,
    ) -> Result<i64> {
        self.perform_command(&Command::AddUserSession {
            access_level,
            session_type,
            origin: origin.to_owned(),
            origin_port: origin_port.unwrap_or_else(std::process::id),
        })
    }

    /// Remove a user session.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn remove_user_session(&mut self, id: i64) -> Result<bool> {
        self.perform_command(&Command::RemoveUserSession { id })
    }

    /// Write a message to the console and/or the log.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn write_message(
        &mut self,
        message_type: MessageType,
        content: &str,
        output_message: bool,
        log_message: bool,
    ) -> Result<()> {
        self.perform_command(&Command::WriteMessage {
            message_type,
            content: content.to_owned(),
            output_message,
            log_message,
        })
    }

    /// Flag whether a software update is in progress.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::perform_command`].
    fn set_update_status(&mut self, updating: bool) -> Result<()> {
        self.perform_command(&Command::SetUpdateStatus { updating })
    }
}

/// Connection opened in command mode.
#[derive(Debug)]
pub struct CommandConnection<T: Transport = Stream> {
    connection: Connection<T>,
}

impl CommandConnection<Stream> {
    /// Connect to the configured socket in command mode.
    ///
    /// # Errors
    ///
    /// See [`Connection::connect`].
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let init = ClientInitMessage::command(config.protocol_version);
        Connection::connect(&init, config).map(|connection| Self { connection })
    }
}

impl<T: Transport> CommandConnection<T> {
    /// Handshake in command mode over an open transport.
    ///
    /// # Errors
    ///
    /// See [`Connection::establish`].
    pub fn establish(transport: T, config: &ClientConfig) -> Result<Self> {
        let init = ClientInitMessage::command(config.protocol_version);
        Connection::establish(transport, &init, config).map(|connection| Self { connection })
    }

    /// Identifier the server assigned to this connection.
    #[must_use]
    pub fn id(&self) -> &str {
        self.connection.id()
    }

    /// Whether the transport is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.connection.is_open()
    }

    /// Close the connection. Idempotent.
    pub fn close(&mut self) {
        self.connection.close();
    }

    /// Give up the typed wrapper and return the raw connection.
    #[must_use]
    pub fn into_inner(self) -> Connection<T> {
        self.connection
    }
}

impl<T: Transport> CommandChannel for CommandConnection<T> {
    fn perform_command<R, S>(&mut self, command: &S) -> Result<R>
    where
        R: DeserializeOwned,
        S: Serialize + ?Sized,
    {
        self.connection.perform_command(command)
    }
}
