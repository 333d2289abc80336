//! BaseX Thin Client for Rust
//!
//! A pure Rust client for the BaseX client/server protocol: a NUL-framed text
//! protocol over TCP with a nonce/digest login, one-shot commands and
//! server-side query cursors that stream results one item at a time.
//!
//! # Example
//!
//! ```no_run
//! use basex_thin_rs::{Result, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Connect and log in
//!     let session = Session::open("localhost", 1984, "admin", "admin").await?;
//!
//!     // Run a command
//!     println!("{}", session.execute("xquery 1+1").await?);
//!     println!("{}", session.info());
//!
//!     // Iterate over a query
//!     let mut query = session.query("for $i in 1 to 3 return $i").await?;
//!     while query.more().await? {
//!         println!("{}", query.value()?);
//!     }
//!     query.close().await?;
//!     drop(query);
//!
//!     // Close session
//!     session.close().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod cursor;
pub mod error;
pub mod protocol;
pub mod session;

// Re-export main types
pub use cursor::{Cursor, CursorStreamExt, Query, QueryState};
pub use error::{Error, Result};
pub use protocol::auth::AuthCredentials;
pub use protocol::connect::ConnectParams;
pub use session::Session;
