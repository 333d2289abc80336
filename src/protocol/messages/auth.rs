//! Login message sent in reply to the server's nonce.

use crate::error::Result;
use crate::protocol::message::{frame_wire_size, Message, WriteExt};

/// Login message: `username\0digest\0`.
///
/// The digest is computed by `crypto::login_digest` from the password and the
/// nonce the server sent on accept.
pub struct LoginMessage<'a> {
    /// Username
    pub username: &'a str,
    /// Hex digest of password and nonce
    pub digest: &'a str,
}

impl Message for LoginMessage<'_> {
    fn wire_size(&self) -> usize {
        frame_wire_size(self.username.as_bytes()) + frame_wire_size(self.digest.as_bytes())
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_frame("username", self.username.as_bytes())?;
        buf.write_frame("digest", self.digest.as_bytes())?;
        Ok(())
    }
}
