//! Blocking read-ahead buffer over a byte source.
//!
//! [`FrameReader`] owns the bytes pulled from the transport that have not yet
//! been handed out as a frame. Each [`FrameReader::read_frame`] call returns
//! exactly one JSON object and keeps any surplus for the next call.

use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::config::ClientConfig;
use crate::framing::codec::JsonObjectCodec;
use crate::{AppError, Result};

/// Accumulating frame buffer fed by blocking reads.
#[derive(Debug)]
pub struct FrameReader {
    buffer: BytesMut,
    codec: JsonObjectCodec,
    chunk: Vec<u8>,
}

impl FrameReader {
    /// Create a reader that requests `read_chunk_bytes` per transport read.
    #[must_use]
    pub fn new(read_chunk_bytes: usize, max_frame_bytes: Option<usize>) -> Self {
        let codec = match max_frame_bytes {
            Some(limit) => JsonObjectCodec::with_max_frame_bytes(limit),
            None => JsonObjectCodec::new(),
        };
        let chunk_len = read_chunk_bytes.max(1);
        Self {
            buffer: BytesMut::with_capacity(chunk_len),
            codec,
            chunk: vec![0; chunk_len],
        }
    }

    /// Create a reader sized from the client configuration.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.read_chunk_bytes, config.max_frame_bytes)
    }

    /// Bytes received but not yet returned as a frame.
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard buffered bytes and any partially scanned frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.codec.reset();
    }

    /// Return the next complete frame, reading from `source` as needed.
    ///
    /// Blocks until `source` delivers the closing brace of the next object.
    /// An object that never closes blocks until the source reports end of
    /// stream.
    ///
    /// # Errors
    ///
    /// - `AppError::Closed` when `source` reaches end of stream first.
    /// - `AppError::Io` when a read fails.
    /// - `AppError::Framing` from the codec (stray bytes, oversize frame,
    ///   invalid UTF-8).
    pub fn read_frame<R: Read + ?Sized>(&mut self, source: &mut R) -> Result<String> {
        loop {
            if let Some(frame) = self.codec.decode(&mut self.buffer)? {
                return Ok(frame);
            }

            let read = match source.read(&mut self.chunk) {
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(AppError::Io(format!("read failed: {err}"))),
            };

            if read == 0 {
                return match self.codec.decode_eof(&mut self.buffer)? {
                    Some(frame) => Ok(frame),
                    None => Err(AppError::Closed("connection closed by peer".into())),
                };
            }

            trace!(read, buffered = self.buffer.len(), "frame reader: chunk received");
            self.buffer.extend_from_slice(&self.chunk[..read]);
        }
    }
}
