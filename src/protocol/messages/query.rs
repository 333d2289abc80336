//! Cursor messages: open, advance and close a server-side query.

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::message::{frame_wire_size, Message, WriteExt};

/// Cursor message: one opcode byte followed by a frame.
///
/// | opcode | payload    | response                     |
/// |--------|------------|------------------------------|
/// | `0x00` | query text | `id\0` status [`error\0`]    |
/// | `0x01` | cursor id  | `item\0` status [`error\0`]  |
/// | `0x02` | cursor id  | none                         |
pub struct QueryMessage<'a> {
    /// Cursor operation.
    pub opcode: u8,
    /// Query text for open, cursor id otherwise.
    pub payload: &'a str,
}

impl<'a> QueryMessage<'a> {
    /// Open a cursor over `query`.
    pub fn open(query: &'a str) -> Self {
        Self {
            opcode: QUERY_OPCODE_OPEN,
            payload: query,
        }
    }

    /// Fetch the next item of cursor `id`.
    pub fn next(id: &'a str) -> Self {
        Self {
            opcode: QUERY_OPCODE_NEXT,
            payload: id,
        }
    }

    /// Release cursor `id` on the server.
    pub fn close(id: &'a str) -> Self {
        Self {
            opcode: QUERY_OPCODE_CLOSE,
            payload: id,
        }
    }

    fn field(&self) -> &'static str {
        match self.opcode {
            QUERY_OPCODE_OPEN => "query",
            _ => "query id",
        }
    }
}

impl Message for QueryMessage<'_> {
    fn wire_size(&self) -> usize {
        1 + frame_wire_size(self.payload.as_bytes())
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_u8(self.opcode);
        buf.write_frame(self.field(), self.payload.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_query_messages_content() {
        assert_eq!(QueryMessage::open("1 to 3").to_vec().unwrap(), b"\x001 to 3\0");
        assert_eq!(QueryMessage::next("7").to_vec().unwrap(), b"\x017\0");
        assert_eq!(QueryMessage::close("7").to_vec().unwrap(), b"\x027\0");
    }

    #[test]
    fn test_query_message_wire_size() {
        let msg = QueryMessage::open("for $i in 1 to 3 return $i");
        assert_eq!(msg.to_vec().unwrap().len(), msg.wire_size());
    }

    #[test]
    fn test_query_text_with_nul() {
        let err = QueryMessage::open("'a\0b'").to_vec().unwrap_err();
        assert!(matches!(err, Error::EmbeddedNul { field: "query" }));
    }
}
