//! BaseX client/server protocol implementation.

pub mod auth;
pub mod channel;
pub mod connect;
pub mod constants;
pub mod crypto;
pub mod message;
pub mod messages;

pub use auth::AuthCredentials;
pub use channel::ByteChannel;
pub use message::{Message, WriteExt};
pub use messages::{CommandMessage, LoginMessage, QueryMessage};
