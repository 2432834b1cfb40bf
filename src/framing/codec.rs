//! Brace-depth codec for delimiter-free JSON object streams.
//!
//! Each frame is one complete JSON object. The decoder scans the buffer for
//! `{` and `}` outside string literals, honouring backslash escapes, and
//! yields the bytes up to and including the `}` that closes the outermost
//! object. Whitespace between frames is skipped.
//!
//! The scan position is kept between calls, so bytes appended to a partial
//! frame are examined once.
//!
//! # Usage
//!
//! ```rust
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//! use dsf_client::framing::codec::JsonObjectCodec;
//!
//! let mut codec = JsonObjectCodec::new();
//! let mut buf = BytesMut::from(r#"{"a":"}"}{"b":1}"#);
//! assert_eq!(codec.decode(&mut buf).ok().flatten().as_deref(), Some(r#"{"a":"}"}"#));
//! assert_eq!(codec.decode(&mut buf).ok().flatten().as_deref(), Some(r#"{"b":1}"#));
//! ```

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{AppError, Result};

/// Longest stray-byte excerpt quoted in a framing error.
const STRAY_EXCERPT_BYTES: usize = 32;

/// Decoder/encoder for back-to-back JSON objects.
#[derive(Debug, Default)]
pub struct JsonObjectCodec {
    /// Offset of the next byte to examine within the pending frame.
    next_index: usize,
    /// Object nesting depth at `next_index`.
    depth: usize,
    in_string: bool,
    escaped: bool,
    max_frame_bytes: Option<usize>,
}

impl JsonObjectCodec {
    /// Create a codec without a frame size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec that rejects frames longer than `max_frame_bytes`.
    #[must_use]
    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self {
            max_frame_bytes: Some(max_frame_bytes),
            ..Self::default()
        }
    }

    /// Whether a frame has been started but not yet closed.
    #[must_use]
    pub fn in_frame(&self) -> bool {
        self.depth > 0
    }

    /// Forget any partially scanned frame.
    pub fn reset(&mut self) {
        self.next_index = 0;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
    }

    /// Drop inter-frame whitespace and reject anything that cannot open an object.
    fn seek_frame_start(src: &mut BytesMut) -> Result<bool> {
        let whitespace = src.iter().take_while(|b| b.is_ascii_whitespace()).count();
        src.advance(whitespace);

        match src.first() {
            None => Ok(false),
            Some(b'{') => Ok(true),
            Some(_) => {
                let skip = src.iter().position(|&b| b == b'{').unwrap_or(src.len());
                let excerpt =
                    String::from_utf8_lossy(&src[..skip.min(STRAY_EXCERPT_BYTES)]).into_owned();
                src.advance(skip);
                Err(AppError::Framing(format!(
                    "discarded {skip} stray bytes between frames: {excerpt:?}"
                )))
            }
        }
    }
}

impl Decoder for JsonObjectCodec {
    type Item = String;
    type Error = AppError;

    /// Split the next complete object off the front of `src`.
    ///
    /// Returns `Ok(None)` while the object is still incomplete.
    ///
    /// # Errors
    ///
    /// - `AppError::Framing` when bytes other than whitespace precede an
    ///   object (a stray `}` included). Those bytes are discarded.
    /// - `AppError::Framing` when a frame is not valid UTF-8.
    /// - `AppError::Framing` when a frame outgrows the configured limit. A
    ///   complete oversized frame is dropped and later frames stay buffered;
    ///   an unterminated one clears the buffer.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if !self.in_frame() && !Self::seek_frame_start(src)? {
            return Ok(None);
        }

        let mut index = self.next_index;
        while index < src.len() {
            let byte = src[index];
            index += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => self.in_string = true,
                b'{' => self.depth += 1,
                b'}' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        let frame = src.split_to(index);
                        self.reset();
                        if let Some(limit) = self.max_frame_bytes {
                            if frame.len() > limit {
                                return Err(AppError::Framing(format!(
                                    "frame exceeds {limit} bytes ({} byte frame discarded)",
                                    frame.len()
                                )));
                            }
                        }
                        return std::str::from_utf8(&frame)
                            .map(|text| Some(text.to_owned()))
                            .map_err(|err| {
                                AppError::Framing(format!("frame is not valid utf-8: {err}"))
                            });
                    }
                }
                _ => {}
            }
        }
        self.next_index = index;

        if let Some(limit) = self.max_frame_bytes {
            if src.len() > limit {
                let pending = src.len();
                src.clear();
                self.reset();
                return Err(AppError::Framing(format!(
                    "frame exceeds {limit} bytes ({pending} buffered without closing brace)"
                )));
            }
        }

        Ok(None)
    }

    /// Decode whatever is left once the transport reports end of stream.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Closed` when a partial frame is still buffered.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        if src.iter().all(u8::is_ascii_whitespace) {
            Ok(None)
        } else {
            Err(AppError::Closed(format!(
                "connection closed with a partial frame of {} bytes buffered",
                src.len()
            )))
        }
    }
}

impl Encoder<String> for JsonObjectCodec {
    type Error = AppError;

    /// Append `item` to `dst` as-is. Frames carry no delimiter.
    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}
