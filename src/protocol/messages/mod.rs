//! Request message definitions.
//!
//! Each message implements the `Message` trait for single-allocation serialization.

pub mod auth;
pub mod command;
pub mod query;

pub use auth::LoginMessage;
pub use command::CommandMessage;
pub use query::QueryMessage;
