//! Codes, code channels, and message types.
//!
//! A [`Code`] is opaque to the protocol engine beyond the handful of fields
//! needed to print it; every other field the server sends is preserved in
//! [`Code::extra`] so a code can be inspected or sent back unchanged.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Source or destination channel of a code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum CodeChannel {
    /// Web interface.
    #[serde(rename = "HTTP")]
    Http,
    /// Telnet session.
    Telnet,
    /// Job file being printed.
    File,
    /// USB serial port.
    #[serde(rename = "USB")]
    Usb,
    /// Auxiliary serial port.
    Aux,
    /// Trigger macros.
    Trigger,
    /// Queued code stream.
    Queue,
    /// Panel display.
    #[serde(rename = "LCD")]
    Lcd,
    /// Single-board computer (the default for client-originated codes).
    #[serde(rename = "SBC")]
    #[default]
    Sbc,
    /// Daemon macros.
    Daemon,
    /// Second auxiliary serial port.
    Aux2,
    /// Automatic pause handling.
    AutoPause,
    /// Second job file stream.
    File2,
    /// Second queued code stream.
    Queue2,
    /// Unidentified channel.
    Unknown,
}

impl CodeChannel {
    /// Every channel a client can intercept.
    pub const ALL: [Self; 14] = [
        Self::Http,
        Self::Telnet,
        Self::File,
        Self::Usb,
        Self::Aux,
        Self::Trigger,
        Self::Queue,
        Self::Lcd,
        Self::Sbc,
        Self::Daemon,
        Self::Aux2,
        Self::AutoPause,
        Self::File2,
        Self::Queue2,
    ];
}

/// Severity of a message attached to a resolved code or written to the log.
///
/// Serialized as its numeric value.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(try_from = "u8")]
pub enum MessageType {
    /// Informational success message.
    #[default]
    Success,
    /// Warning.
    Warning,
    /// Error.
    Error,
}

impl TryFrom<u8> for MessageType {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, String> {
        match value {
            0 => Ok(MessageType::Success),
            1 => Ok(MessageType::Warning),
            2 => Ok(MessageType::Error),
            other => Err(format!("unknown message type {other}")),
        }
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let value: u8 = match self {
            Self::Success => 0,
            Self::Warning => 1,
            Self::Error => 2,
        };
        serializer.serialize_u8(value)
    }
}

/// One parameter of a parsed code, e.g. `X10`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeParameter {
    /// Parameter letter.
    pub letter: String,
    /// Parameter value; numeric, string, or array depending on the code.
    pub value: Value,
}

/// A code delivered by the server, or one built by the client to execute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Code {
    /// Channel the code arrived on.
    #[serde(default)]
    pub channel: CodeChannel,
    /// Code letter: `G`, `M`, `T`, or `Q`; `C` for comments and keywords.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub code_type: Option<String>,
    /// Major code number, e.g. `28` in `G28`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_number: Option<i64>,
    /// Minor code number, e.g. `1` in `M570.1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_number: Option<i64>,
    /// Parsed parameters.
    #[serde(default)]
    pub parameters: Vec<CodeParameter>,
    /// Trailing comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Remaining fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Code {
    /// Whether this is the code `letter` + `major`, ignoring the minor number.
    #[must_use]
    pub fn is(&self, letter: &str, major: i64) -> bool {
        self.code_type.as_deref() == Some(letter) && self.major_number == Some(major)
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(letter) = &self.code_type {
            write!(f, "{letter}")?;
        }
        if let Some(major) = self.major_number {
            write!(f, "{major}")?;
            if let Some(minor) = self.minor_number {
                write!(f, ".{minor}")?;
            }
        }
        for parameter in &self.parameters {
            match &parameter.value {
                Value::String(text) => write!(f, " {}\"{text}\"", parameter.letter)?,
                other => write!(f, " {}{other}", parameter.letter)?,
            }
        }
        if let Some(comment) = &self.comment {
            write!(f, " ; {comment}")?;
        }
        Ok(())
    }
}
