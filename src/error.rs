//! Error types for the BaseX thin client.

use crate::cursor::QueryState;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for BaseX operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for BaseX thin client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during network communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server closed the connection, possibly in the middle of a frame.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Connection timed out during TCP connect.
    #[error("Connection to {host}:{port} timed out after {timeout:?}")]
    ConnectionTimeout {
        host: String,
        port: u16,
        timeout: Duration,
    },

    /// DNS resolution failed.
    #[error("Failed to resolve hostname '{hostname}': {message}")]
    DnsResolutionFailed { hostname: String, message: String },

    /// A read or write exceeded the configured I/O deadline.
    #[error("I/O timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// An earlier connectivity failure left the session out of sync with the server.
    #[error("Session is no longer usable after a connectivity failure")]
    SessionBroken,

    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The server rejected a command. Carries the server's info string.
    #[error("Command failed: {message}")]
    Command { message: String },

    /// The server rejected a query when opening the cursor.
    #[error("Query failed: {message}")]
    QueryOpen { message: String },

    /// The server reported an error while advancing a cursor.
    #[error("Query iteration failed: {message}")]
    QueryAdvance { message: String },

    /// Cursor operation called in a state that does not permit it.
    #[error("Cannot {operation} a query in state {state}")]
    InvalidState {
        operation: &'static str,
        state: QueryState,
    },

    /// A field contains a NUL byte, which the framing cannot carry.
    #[error("{field} must not contain NUL bytes")]
    EmbeddedNul { field: &'static str },

    /// Invalid connect string.
    #[error("Invalid connect string: {message}")]
    InvalidConnectString { message: String },
}

impl Error {
    /// Create a command error.
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }

    /// Whether this error leaves the connection unusable.
    ///
    /// Server-reported failures (commands, queries) are scoped to one exchange;
    /// connectivity failures are not, because the protocol has no way to
    /// resynchronize a half-read response.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::ConnectionClosed
                | Self::ConnectionTimeout { .. }
                | Self::DnsResolutionFailed { .. }
                | Self::Timeout { .. }
                | Self::SessionBroken
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(Error::ConnectionClosed.is_connectivity());
        assert!(Error::Timeout {
            timeout: Duration::from_secs(1)
        }
        .is_connectivity());
        assert!(Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "gone")).is_connectivity());

        assert!(!Error::command("Database 'x' was not found.").is_connectivity());
        assert!(!Error::AuthenticationFailed {
            message: "Access denied".into()
        }
        .is_connectivity());
        assert!(!Error::EmbeddedNul { field: "command" }.is_connectivity());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::command("Stopped at line 1, column 3");
        assert_eq!(err.to_string(), "Command failed: Stopped at line 1, column 3");

        let err = Error::InvalidState {
            operation: "read the current item of",
            state: QueryState::Exhausted,
        };
        assert_eq!(
            err.to_string(),
            "Cannot read the current item of a query in state exhausted"
        );
    }
}
