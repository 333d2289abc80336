//! Buffered byte channel over the server socket.
//!
//! Every protocol field is a NUL-terminated string, and the server streams
//! responses without length prefixes, so the client has to scan byte by byte.
//! The channel keeps one receive chunk around to avoid a syscall per byte.

use crate::error::{Error, Result};
use crate::protocol::constants::{FRAME_TERMINATOR, RECEIVE_CHUNK_SIZE};
use bytes::{BufMut, Bytes, BytesMut};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Byte-level reader/writer bound to a single connection.
pub struct ByteChannel<S = TcpStream> {
    stream: S,
    /// Last chunk received from the stream.
    buf: Box<[u8]>,
    /// Next unread position in `buf`.
    pos: usize,
    /// Number of valid bytes in `buf`.
    len: usize,
    /// Deadline applied to each receive and each write.
    io_timeout: Option<Duration>,
}

impl<S> ByteChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new channel over `stream`.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: vec![0u8; RECEIVE_CHUNK_SIZE].into_boxed_slice(),
            pos: 0,
            len: 0,
            io_timeout: None,
        }
    }

    /// Bound every receive and write by `timeout`.
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Number of received bytes not yet consumed.
    pub fn buffered(&self) -> usize {
        self.len - self.pos
    }

    /// Read a single byte, refilling the buffer from the stream when exhausted.
    pub async fn read_byte(&mut self) -> Result<u8> {
        if self.pos == self.len {
            self.fill().await?;
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Read one NUL-terminated frame. The terminator is consumed but not returned.
    pub async fn read_string(&mut self) -> Result<Bytes> {
        let mut frame = BytesMut::new();
        loop {
            // Scan the buffered chunk directly instead of going through
            // read_byte for every byte of large items.
            if self.pos == self.len {
                self.fill().await?;
            }
            let chunk = &self.buf[self.pos..self.len];
            match chunk.iter().position(|&b| b == FRAME_TERMINATOR) {
                Some(end) => {
                    frame.put_slice(&chunk[..end]);
                    self.pos += end + 1;
                    return Ok(frame.freeze());
                }
                None => {
                    frame.put_slice(chunk);
                    self.pos = self.len;
                }
            }
        }
    }

    /// Write `bytes` as-is and flush. Framing is the caller's job.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let io_timeout = self.io_timeout;
        let stream = &mut self.stream;
        with_deadline(io_timeout, async move {
            stream.write_all(bytes).await?;
            stream.flush().await?;
            Ok::<_, Error>(())
        })
        .await
    }

    /// Shut down the write half of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Replace the buffer with the next chunk from the stream.
    async fn fill(&mut self) -> Result<()> {
        let io_timeout = self.io_timeout;
        let stream = &mut self.stream;
        let buf = &mut self.buf;
        let n = with_deadline(io_timeout, async move { Ok::<_, Error>(stream.read(buf).await?) })
            .await?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        self.pos = 0;
        self.len = n;
        Ok(())
    }
}

async fn with_deadline<T>(
    timeout: Option<Duration>,
    io: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, io)
            .await
            .map_err(|_| Error::Timeout { timeout })?,
        None => io.await,
    }
}
