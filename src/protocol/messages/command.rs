//! Command message for one-shot database commands.

use crate::error::Result;
use crate::protocol::constants::COMMAND_EXIT;
use crate::protocol::message::{frame_wire_size, Message, WriteExt};

/// Command message: `command\0`.
///
/// The server answers with `result\0info\0` and a status byte.
pub struct CommandMessage<'a> {
    /// Command text, e.g. `xquery 1+1` or `open factbook`.
    pub command: &'a str,
}

impl<'a> CommandMessage<'a> {
    /// Create a new command message.
    pub fn new(command: &'a str) -> Self {
        Self { command }
    }

    /// The command that ends the session. The server sends no response.
    pub fn exit() -> CommandMessage<'static> {
        CommandMessage {
            command: COMMAND_EXIT,
        }
    }
}

impl Message for CommandMessage<'_> {
    fn wire_size(&self) -> usize {
        frame_wire_size(self.command.as_bytes())
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_frame("command", self.command.as_bytes())
    }
}
