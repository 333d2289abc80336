//! Connection parameters and TCP establishment.

use crate::error::{Error, Result};
use crate::protocol::constants::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_PORT};
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;

/// Connection parameters.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    /// Host address.
    pub host: String,
    /// Port number.
    pub port: u16,
    /// TCP connection timeout (default: 20 seconds).
    pub connect_timeout: Duration,
    /// Deadline for each socket read and write. `None` waits forever.
    pub io_timeout: Option<Duration>,
    /// Disable Nagle's algorithm. Requests are small and latency-bound.
    pub nodelay: bool,
}

impl ConnectParams {
    /// Create new connection parameters.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            io_timeout: None,
            nodelay: true,
        }
    }

    /// Set the connection timeout.
    ///
    /// # Example
    ///
    /// ```
    /// use basex_thin_rs::ConnectParams;
    /// use std::time::Duration;
    ///
    /// let params = ConnectParams::new("localhost", 1984)
    ///     .with_connect_timeout(Duration::from_secs(5));
    /// ```
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set a deadline for every read and write on the session.
    ///
    /// A session whose deadline expires is unusable afterwards: the protocol
    /// has no way to skip the rest of a response that arrives late.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }

    /// Set TCP_NODELAY on the socket.
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Parse a connection string like "host:port" or "host" (port 1984).
    ///
    /// IPv6 literals must be bracketed: "[::1]:1984" or "[::1]".
    pub fn parse(conn_str: &str) -> Result<Self> {
        let (host, port) = match conn_str.strip_prefix('[') {
            Some(rest) => {
                let (host, tail) = rest
                    .split_once(']')
                    .ok_or_else(|| invalid_connect_string("Missing ']' after IPv6 address"))?;
                let port = match tail {
                    "" => DEFAULT_PORT,
                    _ => match tail.strip_prefix(':') {
                        Some(p) => parse_port(p)?,
                        None => return Err(invalid_connect_string("Expected ':' after ']'")),
                    },
                };
                (host, port)
            }
            None => match conn_str.rsplit_once(':') {
                Some((h, _)) if h.contains(':') => {
                    return Err(invalid_connect_string(
                        "IPv6 addresses must be enclosed in brackets, e.g. [::1]:1984",
                    ));
                }
                Some((h, p)) => (h, parse_port(p)?),
                None => (conn_str, DEFAULT_PORT),
            },
        };

        if host.is_empty() {
            return Err(invalid_connect_string("Expected format: host[:port]"));
        }

        Ok(Self::new(host, port))
    }
}

fn parse_port(p: &str) -> Result<u16> {
    p.parse::<u16>()
        .map_err(|_| invalid_connect_string(format!("Invalid port: {}", p)))
}

fn invalid_connect_string(message: impl Into<String>) -> Error {
    Error::InvalidConnectString {
        message: message.into(),
    }
}

/// Resolve the host and open a TCP connection to the first address that accepts.
pub async fn open_stream(params: &ConnectParams) -> Result<TcpStream> {
    let addrs = timeout(
        params.connect_timeout,
        lookup_host((params.host.as_str(), params.port)),
    )
        .await
        .map_err(|_| connect_timeout_error(params))?
        .map_err(|e| {
            // Check if this is a DNS-specific error
            if e.kind() == std::io::ErrorKind::NotFound
                || e.to_string().contains("could not resolve")
                || e.to_string().contains("Name or service not known")
                || e.to_string().contains("nodename nor servname provided")
                || e.to_string().contains("failed to lookup address")
            {
                Error::DnsResolutionFailed {
                    hostname: params.host.clone(),
                    message: e.to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;

    let mut last_error = None;
    for addr in addrs {
        match timeout(params.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                stream.set_nodelay(params.nodelay)?;
                tracing::debug!(%addr, "connected");
                return Ok(stream);
            }
            Ok(Err(e)) => {
                tracing::debug!(%addr, error = %e, "connect attempt failed");
                last_error = Some(Error::Io(e));
            }
            Err(_) => return Err(connect_timeout_error(params)),
        }
    }

    Err(last_error.unwrap_or_else(|| Error::DnsResolutionFailed {
        hostname: params.host.clone(),
        message: "No addresses returned".to_string(),
    }))
}

fn connect_timeout_error(params: &ConnectParams) -> Error {
    Error::ConnectionTimeout {
        host: params.host.clone(),
        port: params.port,
        timeout: params.connect_timeout,
    }
}
