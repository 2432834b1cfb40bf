//! Outbound frame serialization.
//!
//! Serializes a value to compact JSON and writes it to the transport as one
//! frame. No delimiter follows the object; the peer recovers the boundary
//! from brace depth.

use std::io::Write;

use bytes::BytesMut;
use serde::Serialize;
use tokio_util::codec::Encoder;

use crate::framing::codec::JsonObjectCodec;
use crate::{AppError, Result};

/// Serialize `value` into the text of one outbound frame.
///
/// # Errors
///
/// Returns `AppError::Json` if serialization fails, or `AppError::Framing`
/// if the value is not a JSON object.
pub fn encode_frame<S: Serialize + ?Sized>(value: &S) -> Result<String> {
    let json = serde_json::to_string(value)
        .map_err(|e| AppError::Json(format!("failed to serialise outbound message: {e}")))?;

    if !json.starts_with('{') {
        return Err(AppError::Framing(format!(
            "outbound message must be a json object, got: {json}"
        )));
    }

    Ok(json)
}

/// Write an encoded frame to `sink` and flush it.
///
/// # Errors
///
/// Returns `AppError::Io` if the write or flush fails.
pub fn write_frame<W: Write + ?Sized>(sink: &mut W, frame: String) -> Result<()> {
    let mut bytes = BytesMut::with_capacity(frame.len());
    JsonObjectCodec::new().encode(frame, &mut bytes)?;

    sink.write_all(&bytes)
        .map_err(|e| AppError::Io(format!("write failed: {e}")))?;
    sink.flush()
        .map_err(|e| AppError::Io(format!("flush failed: {e}")))
}
