//! Message framing for the control server's JSON stream.
//!
//! The wire carries back-to-back JSON objects with no length prefix and no
//! delimiter. Boundaries are recovered by tracking object nesting depth.
//!
//! Submodules:
//! - `codec`: [`JsonObjectCodec`](codec::JsonObjectCodec), a
//!   [`Decoder`](tokio_util::codec::Decoder) that splits one object off an
//!   accumulating buffer.
//! - `reader`: [`FrameReader`](reader::FrameReader), the blocking read-ahead
//!   buffer that feeds the codec from a transport.
//! - `writer`: outbound frame serialization.

pub mod codec;
pub mod reader;
pub mod writer;
