//! High-level Session API for the BaseX thin client.

use crate::cursor::Query;
use crate::error::{Error, Result};
use crate::protocol::auth::{authenticate, AuthCredentials};
use crate::protocol::channel::ByteChannel;
use crate::protocol::connect::{open_stream, ConnectParams};
use crate::protocol::constants::STATUS_OK;
use crate::protocol::message::Message;
use crate::protocol::messages::CommandMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, MutexGuard};

/// An authenticated BaseX session.
///
/// The protocol is strictly half-duplex: a request must be written and its
/// whole response consumed before the next request goes out. Every operation
/// takes the session's channel lock for its full round trip, so commands and
/// any number of [`Query`] cursors can share one session without interleaving
/// bytes on the wire.
pub struct Session<S = TcpStream> {
    /// Channel to the server, held for one round trip at a time.
    channel: Mutex<ByteChannel<S>>,
    /// Info string of the most recent command.
    info: StdMutex<String>,
    /// Set once a connectivity failure leaves the stream mid-response.
    broken: AtomicBool,
}

impl Session<TcpStream> {
    /// Connect to a BaseX server and log in.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use basex_thin_rs::Session;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let session = Session::open("localhost", 1984, "admin", "admin").await?;
    ///     println!("{}", session.execute("xquery 1+1").await?);
    ///     println!("{}", session.info());
    ///     session.close().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn open(host: &str, port: u16, username: &str, password: &str) -> Result<Self> {
        Self::connect_with_params(&ConnectParams::new(host, port), username, password).await
    }

    /// Connect using a connection string in format "host[:port]".
    pub async fn connect(conn_str: &str, username: &str, password: &str) -> Result<Self> {
        let params = ConnectParams::parse(conn_str)?;
        Self::connect_with_params(&params, username, password).await
    }

    /// Connect with explicit connection parameters.
    pub async fn connect_with_params(
        params: &ConnectParams,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let stream = open_stream(params).await?;
        let channel = ByteChannel::new(stream).with_io_timeout(params.io_timeout);
        Self::establish(channel, &AuthCredentials::new(username, password)).await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Log in over an already connected stream.
    pub async fn from_stream(stream: S, username: &str, password: &str) -> Result<Self> {
        let creds = AuthCredentials::new(username, password);
        Self::establish(ByteChannel::new(stream), &creds).await
    }

    async fn establish(mut channel: ByteChannel<S>, creds: &AuthCredentials) -> Result<Self> {
        authenticate(&mut channel, creds).await?;
        Ok(Self {
            channel: Mutex::new(channel),
            info: StdMutex::new(String::new()),
            broken: AtomicBool::new(false),
        })
    }

    /// Execute a database command and return its result.
    ///
    /// The command's info string is available from [`Session::info`] afterwards,
    /// whether the command succeeded or not. On failure the error carries the
    /// info string; the result the server sent is discarded.
    pub async fn execute(&self, command: &str) -> Result<String> {
        let mut turn = self.turn().await?;
        turn.send(&CommandMessage::new(command)).await?;
        let result = turn.receive().await?;
        let info = turn.receive().await?;
        let ok = turn.ok().await?;
        // Stored under the channel lock so info() follows wire order.
        self.set_info(info.clone());
        turn.finish();

        tracing::debug!(command, ok, "executed command");
        if ok {
            Ok(result)
        } else {
            Err(Error::command(info))
        }
    }

    /// Info string of the most recently executed command.
    pub fn info(&self) -> String {
        self.info
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Open a server-side cursor over `query`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use basex_thin_rs::Session;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let session = Session::open("localhost", 1984, "admin", "admin").await?;
    ///
    ///     let mut query = session.query("for $i in 1 to 10 return <xml>Text {$i}</xml>").await?;
    ///     while query.more().await? {
    ///         println!("{}", query.value()?);
    ///     }
    ///     query.close().await?;
    ///     drop(query);
    ///
    ///     session.close().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn query(&self, query: &str) -> Result<Query<'_, S>> {
        Query::open(self, query).await
    }

    /// Run `query` through a cursor and collect every item.
    ///
    /// The cursor is closed before returning, also when iteration fails with a
    /// server-reported error.
    pub async fn query_all(&self, query: &str) -> Result<Vec<String>> {
        let mut cursor = self.query(query).await?;
        let mut items = Vec::new();
        let drained = async {
            while cursor.more().await? {
                items.push(cursor.value()?.to_owned());
            }
            Ok::<_, Error>(())
        }
        .await;

        match drained {
            Ok(()) => {
                cursor.close().await?;
                Ok(items)
            }
            Err(e) => {
                if !e.is_connectivity() {
                    if let Err(close_err) = cursor.close().await {
                        tracing::debug!(error = %close_err, "failed to close query after error");
                    }
                }
                Err(e)
            }
        }
    }

    /// Whether an earlier connectivity failure made this session unusable.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    /// End the session and close the connection.
    ///
    /// The connection is released even if sending `exit` fails.
    pub async fn close(self) -> Result<()> {
        let broken = self.is_broken();
        let mut channel = self.channel.into_inner();

        let sent = if broken {
            Ok(())
        } else {
            match CommandMessage::exit().to_vec() {
                Ok(bytes) => channel.write_raw(&bytes).await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = channel.shutdown().await {
            tracing::debug!(error = %e, "socket shutdown failed");
        }
        drop(channel);

        tracing::debug!("session closed");
        sent
    }

    /// Take exclusive use of the connection for one request/response exchange.
    pub(crate) async fn turn(&self) -> Result<Turn<'_, S>> {
        if self.is_broken() {
            return Err(Error::SessionBroken);
        }
        let channel = self.channel.lock().await;
        // Another turn may have failed while we were waiting for the lock.
        if self.is_broken() {
            return Err(Error::SessionBroken);
        }
        Ok(Turn {
            channel,
            broken: &self.broken,
            pending: false,
        })
    }

    fn set_info(&self, info: String) {
        *self.info.lock().unwrap_or_else(PoisonError::into_inner) = info;
    }
}

/// Exclusive access to the session's connection for one exchange.
///
/// Provides the three primitives every exchange is built from: send a
/// request, receive a frame, check a status byte. A connectivity failure in
/// any of them marks the session broken, and so does dropping the turn
/// between [`Turn::send`] and [`Turn::finish`].
pub(crate) struct Turn<'a, S> {
    channel: MutexGuard<'a, ByteChannel<S>>,
    broken: &'a AtomicBool,
    /// A request went out and its response has not been fully read.
    pending: bool,
}

impl<S> Turn<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Serialize and write a request.
    pub(crate) async fn send<M: Message>(&mut self, msg: &M) -> Result<()> {
        let bytes = msg.to_vec()?;
        self.pending = true;
        let written = self.channel.write_raw(&bytes).await;
        self.track(written)
    }

    /// Mark the exchange complete and release the channel.
    pub(crate) fn finish(mut self) {
        self.pending = false;
    }

    /// Read one frame, decoded as UTF-8 (lossy).
    pub(crate) async fn receive(&mut self) -> Result<String> {
        let frame = self.channel.read_string().await;
        let frame = self.track(frame)?;
        Ok(String::from_utf8_lossy(&frame).into_owned())
    }

    /// Read a status byte and report whether it signals success.
    pub(crate) async fn ok(&mut self) -> Result<bool> {
        let status = self.channel.read_byte().await;
        Ok(self.track(status)? == STATUS_OK)
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_connectivity() && !self.broken.swap(true, Ordering::AcqRel) {
                tracing::warn!(error = %e, "connectivity failure, session is no longer usable");
            }
        }
        result
    }
}

impl<S> Drop for Turn<'_, S> {
    fn drop(&mut self) {
        if self.pending && !self.broken.swap(true, Ordering::AcqRel) {
            tracing::warn!("exchange abandoned mid-response, session is no longer usable");
        }
    }
}
