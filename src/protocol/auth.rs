//! Nonce/digest authentication handshake.

use crate::error::{Error, Result};
use crate::protocol::channel::ByteChannel;
use crate::protocol::constants::STATUS_OK;
use crate::protocol::crypto::login_digest;
use crate::protocol::message::{check_frame, Message};
use crate::protocol::messages::LoginMessage;
use tokio::io::{AsyncRead, AsyncWrite};

/// Authentication credentials.
#[derive(Clone)]
pub struct AuthCredentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl AuthCredentials {
    /// Create new credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Run the login handshake on a freshly connected channel.
///
/// 1. Server sends its nonce as one frame.
/// 2. Client sends `username\0digest\0`.
/// 3. Server answers with a single status byte.
pub async fn authenticate<S>(channel: &mut ByteChannel<S>, creds: &AuthCredentials) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // Validated before any I/O so a bad credential leaves the stream untouched.
    check_frame("username", creds.username.as_bytes())?;
    check_frame("password", creds.password.as_bytes())?;

    let nonce = channel.read_string().await?;
    tracing::debug!(username = %creds.username, "received login nonce");

    let digest = login_digest(&creds.password, &nonce);
    let msg = LoginMessage {
        username: &creds.username,
        digest: &digest,
    };
    channel.write_raw(&msg.to_vec()?).await?;

    if channel.read_byte().await? != STATUS_OK {
        return Err(Error::AuthenticationFailed {
            message: format!("Access denied for user '{}'", creds.username),
        });
    }
    tracing::debug!(username = %creds.username, "authenticated");
    Ok(())
}
