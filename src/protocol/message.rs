//! Message traits for single-allocation request serialization.
//!
//! Every request the client sends is a sequence of NUL-terminated frames,
//! optionally preceded by a one-byte opcode. Messages implement `Message` so
//! the wire size is known before the request buffer is allocated.

use crate::error::{Error, Result};
use crate::protocol::constants::FRAME_TERMINATOR;

/// A request that can calculate its wire size and serialize to bytes.
pub trait Message {
    /// Calculate the serialized size in bytes.
    fn wire_size(&self) -> usize;

    /// Write message content to buffer.
    ///
    /// Fails without partial effect on the wire if a field cannot be framed.
    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()>;

    /// Serialize into a freshly allocated buffer of exactly `wire_size()` bytes.
    fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.wire_size());
        self.write_to(&mut buf)?;
        Ok(buf)
    }
}

/// Wire size of a frame carrying `payload`.
#[inline]
pub const fn frame_wire_size(payload: &[u8]) -> usize {
    payload.len() + 1
}

/// Extension trait for writing protocol primitives to a `Vec<u8>`.
pub trait WriteExt {
    fn write_u8(&mut self, val: u8);

    /// Write `payload` followed by the frame terminator.
    ///
    /// `field` names the payload in the error raised when it contains a NUL byte.
    fn write_frame(&mut self, field: &'static str, payload: &[u8]) -> Result<()>;
}

impl WriteExt for Vec<u8> {
    #[inline]
    fn write_u8(&mut self, val: u8) {
        self.push(val);
    }

    fn write_frame(&mut self, field: &'static str, payload: &[u8]) -> Result<()> {
        check_frame(field, payload)?;
        self.extend_from_slice(payload);
        self.push(FRAME_TERMINATOR);
        Ok(())
    }
}

/// Reject payloads the framing cannot carry.
pub fn check_frame(field: &'static str, payload: &[u8]) -> Result<()> {
    if payload.contains(&FRAME_TERMINATOR) {
        return Err(Error::EmbeddedNul { field });
    }
    Ok(())
}
