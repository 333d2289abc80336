//! BaseX client/server protocol constants.

// Framing
pub const FRAME_TERMINATOR: u8 = 0x00;

// Status bytes
pub const STATUS_OK: u8 = 0x00;

// Cursor opcodes
pub const QUERY_OPCODE_OPEN: u8 = 0x00;
pub const QUERY_OPCODE_NEXT: u8 = 0x01;
pub const QUERY_OPCODE_CLOSE: u8 = 0x02;

// Session commands
pub const COMMAND_EXIT: &str = "exit";

// Transport
pub const RECEIVE_CHUNK_SIZE: usize = 4096;
pub const DEFAULT_PORT: u16 = 1984;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 20;
