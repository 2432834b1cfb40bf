//! Response envelope returned for every request on a command channel.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::{AppError, Result};

/// Error kind the server reports when the task behind a request was canceled.
pub const TASK_CANCELED_ERROR: &str = "TaskCanceledException";

/// Reply to one request. Responses arrive in request order, one per request.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// Whether the request succeeded.
    pub success: bool,
    /// Result payload on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error kind on failure.
    #[serde(default)]
    pub error_type: Option<String>,
    /// Error message on failure.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ResponseEnvelope {
    /// Whether this is a failure caused by remote task cancellation.
    #[must_use]
    pub fn is_task_canceled(&self) -> bool {
        !self.success && self.error_type.as_deref() == Some(TASK_CANCELED_ERROR)
    }

    /// Decode the result into `R`, or turn a failure into the matching error.
    ///
    /// A missing result decodes as JSON `null`, so `()` and `Option<T>`
    /// work for commands that return nothing.
    ///
    /// # Errors
    ///
    /// - `AppError::TaskCanceled` when the server reports
    ///   [`TASK_CANCELED_ERROR`].
    /// - `AppError::ServerFault` for any other failure, carrying `command`
    ///   and the server's error kind and message unchanged.
    /// - `AppError::Json` when the result does not fit `R`.
    pub fn into_result<R: DeserializeOwned>(self, command: Value) -> Result<R> {
        if self.success {
            let result = self.result.unwrap_or(Value::Null);
            return serde_json::from_value(result)
                .map_err(|err| AppError::Json(format!("unexpected result shape: {err}")));
        }

        if self.is_task_canceled() {
            return Err(AppError::TaskCanceled(
                self.error_message.unwrap_or_default(),
            ));
        }

        Err(AppError::ServerFault {
            command,
            error_type: self.error_type.unwrap_or_default(),
            error_message: self.error_message.unwrap_or_default(),
        })
    }
}
