//! Server-side query cursors.
//!
//! A [`Query`] is an iterator over the items a query produces, fetched from
//! the server one item per round trip. The `Cursor` trait gives the common
//! `next`/`fetch_all` interface on top of the raw `more`/`value` protocol,
//! and `CursorStreamExt` turns any cursor into a `futures::Stream`.

use crate::error::{Error, Result};
use crate::protocol::messages::QueryMessage;
use crate::session::Session;
use futures::Stream;
use std::fmt;
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Lifecycle state of a [`Query`].
///
/// ```text
/// Open ──more()──► Item ──more()──► Item ... ──more()──► Exhausted
///   │                │                                      │
///   └────────────────┴──── server error ──► Failed          │
///   any state ───────────────── close() ──► Closed ◄────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Opened on the server, nothing fetched yet.
    Open,
    /// The last `more()` fetched an item, readable via `value()`.
    Item,
    /// The server reported the end of the results.
    Exhausted,
    /// The server reported an error while advancing.
    Failed,
    /// The server-side cursor was released.
    Closed,
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Item => "item",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Base trait for cursor types.
///
/// # Example
///
/// ```no_run
/// use basex_thin_rs::{Cursor, Session};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let session = Session::open("localhost", 1984, "admin", "admin").await?;
///
///     // Generic function that works with any cursor type
///     async fn count<C: Cursor<Item = String>>(cursor: &mut C) -> basex_thin_rs::Result<u64> {
///         let mut count = 0;
///         while cursor.next().await?.is_some() {
///             count += 1;
///         }
///         Ok(count)
///     }
///
///     let mut query = session.query("//city").await?;
///     let total = count(&mut query).await?;
///     query.close().await?;
///
///     Ok(())
/// }
/// ```
pub trait Cursor {
    /// The type of item this cursor yields.
    type Item;

    /// Server-assigned cursor id.
    fn id(&self) -> &str;

    /// Check if the server-side cursor was released.
    fn is_closed(&self) -> bool;

    /// Check if advancing may still produce items.
    fn has_more(&self) -> bool;

    /// Release the server-side cursor.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Fetch the next item.
    ///
    /// Returns `Ok(None)` when exhausted.
    fn next(&mut self) -> impl Future<Output = Result<Option<Self::Item>>> + Send;

    /// Fetch all remaining items into a vector.
    ///
    /// Does not close the cursor.
    fn fetch_all(&mut self) -> impl Future<Output = Result<Vec<Self::Item>>> + Send;
}

/// A server-side query cursor.
///
/// Borrows the [`Session`] it was opened on, so it cannot outlive it. Several
/// queries may be open on one session at once; their round trips are
/// serialized by the session.
///
/// # Lifecycle
///
/// 1. Created by `Session::query()`
/// 2. Iterated via `more()` + `value()`, or `Cursor::next()`
/// 3. Released via `close()`. Dropping an unclosed query leaves the cursor
///    allocated on the server until the session ends.
pub struct Query<'s, S = TcpStream> {
    /// Session that owns the connection.
    session: &'s Session<S>,
    /// Cursor id assigned by the server.
    id: String,
    state: QueryState,
    /// Item fetched by the last successful `more()`.
    current: Option<String>,
}

impl<'s, S> Query<'s, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Open a cursor over `query`.
    ///
    /// This is called by `Session::query()`.
    pub(crate) async fn open(session: &'s Session<S>, query: &str) -> Result<Self> {
        let mut turn = session.turn().await?;
        turn.send(&QueryMessage::open(query)).await?;
        let id = turn.receive().await?;
        if !turn.ok().await? {
            let message = turn.receive().await?;
            turn.finish();
            tracing::debug!(%message, "query rejected");
            return Err(Error::QueryOpen { message });
        }
        turn.finish();
        tracing::debug!(%id, "query opened");

        Ok(Self {
            session,
            id,
            state: QueryState::Open,
            current: None,
        })
    }

    /// Get the cursor id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the current state.
    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Advance to the next item.
    ///
    /// Returns `true` if an item was fetched (read it with [`Query::value`]),
    /// `false` once the results are exhausted. Further calls after exhaustion
    /// keep returning `false` without contacting the server.
    pub async fn more(&mut self) -> Result<bool> {
        match self.state {
            QueryState::Open | QueryState::Item => {}
            QueryState::Exhausted => return Ok(false),
            state @ (QueryState::Failed | QueryState::Closed) => {
                return Err(Error::InvalidState {
                    operation: "advance",
                    state,
                })
            }
        }

        self.current = None;
        match self.fetch().await {
            Ok(Some(item)) => {
                self.current = Some(item);
                self.state = QueryState::Item;
                Ok(true)
            }
            Ok(None) => {
                tracing::debug!(id = %self.id, "query exhausted");
                self.state = QueryState::Exhausted;
                Ok(false)
            }
            Err(e) => {
                self.state = QueryState::Failed;
                Err(e)
            }
        }
    }

    /// The item fetched by the last `more()` that returned `true`.
    pub fn value(&self) -> Result<&str> {
        match (self.state, &self.current) {
            (QueryState::Item, Some(item)) => Ok(item),
            (state, _) => Err(Error::InvalidState {
                operation: "read the current item of",
                state,
            }),
        }
    }

    /// Release the server-side cursor. The session stays open.
    ///
    /// Closing an already closed query does nothing.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == QueryState::Closed {
            return Ok(());
        }
        let mut turn = self.session.turn().await?;
        turn.send(&QueryMessage::close(&self.id)).await?;
        turn.finish();

        tracing::debug!(id = %self.id, "query closed");
        self.state = QueryState::Closed;
        self.current = None;
        Ok(())
    }

    /// One advance round trip. An empty item marks the end of the results.
    async fn fetch(&self) -> Result<Option<String>> {
        let mut turn = self.session.turn().await?;
        turn.send(&QueryMessage::next(&self.id)).await?;
        let item = turn.receive().await?;
        if !turn.ok().await? {
            let message = turn.receive().await?;
            turn.finish();
            return Err(Error::QueryAdvance { message });
        }
        turn.finish();
        Ok((!item.is_empty()).then_some(item))
    }
}

impl<S> Drop for Query<'_, S> {
    fn drop(&mut self) {
        if self.state != QueryState::Closed {
            tracing::warn!(id = %self.id, "query dropped without close");
        }
    }
}

impl<S> Cursor for Query<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    type Item = String;

    fn id(&self) -> &str {
        &self.id
    }

    fn is_closed(&self) -> bool {
        self.state == QueryState::Closed
    }

    fn has_more(&self) -> bool {
        matches!(self.state, QueryState::Open | QueryState::Item)
    }

    async fn close(&mut self) -> Result<()> {
        Query::close(self).await
    }

    async fn next(&mut self) -> Result<Option<Self::Item>> {
        if self.more().await? {
            Ok(self.current.take())
        } else {
            Ok(None)
        }
    }

    async fn fetch_all(&mut self) -> Result<Vec<Self::Item>> {
        let mut items = Vec::new();
        while let Some(item) = Cursor::next(self).await? {
            items.push(item);
        }
        Ok(items)
    }
}

/// Extension trait for converting Cursor to Stream.
///
/// # Example
///
/// ```no_run
/// use basex_thin_rs::{CursorStreamExt, Session};
/// use futures::stream::TryStreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let session = Session::open("localhost", 1984, "admin", "admin").await?;
///
///     let query = session.query("for $i in 1 to 5 return $i * $i").await?;
///     let squares: Vec<u64> = query
///         .into_stream()
///         .map_ok(|item| item.parse::<u64>().unwrap())
///         .try_collect()
///         .await?;
///
///     Ok(())
/// }
/// ```
pub trait CursorStreamExt: Cursor + Sized {
    /// Convert this cursor into a Stream yielding `Result<Item>`.
    ///
    /// The stream takes ownership of the cursor and ends after the first
    /// error or once the cursor is exhausted.
    fn into_stream(self) -> impl Stream<Item = Result<Self::Item>>;
}

impl<C: Cursor + Unpin> CursorStreamExt for C {
    fn into_stream(self) -> impl Stream<Item = Result<Self::Item>> {
        use futures::stream;

        stream::unfold(Some(self), |opt_cursor| async move {
            let mut cursor = opt_cursor?;
            match cursor.next().await {
                Ok(Some(item)) => Some((Ok(item), Some(cursor))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
