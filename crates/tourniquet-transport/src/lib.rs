//! Line transport abstraction layer for Tourniquet.
//!
//! Provides the [`LineConnection`] trait that abstracts over a persistent,
//! bidirectional connection carrying newline-terminated text. The handshake
//! never sees sockets or bytes, only whole lines.
//!
//! # Feature Flags
//!
//! - `tcp` (default): TCP transport via `tokio::net::TcpStream`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
#[cfg(feature = "tcp")]
pub use tcp::{MAX_LINE_BYTES, TcpLineConnection};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-unique `ConnectionId`.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single connection that exchanges newline-terminated text lines.
///
/// One logical message per line, no length prefix and no escaping. A value
/// containing a newline is written as-is.
pub trait LineConnection: Send + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Receives the next line from the remote peer, without its terminator.
    ///
    /// Returns `Ok(None)` when the peer has closed the connection.
    async fn read_line(&mut self) -> Result<Option<String>, Self::Error>;

    /// Sends one line to the remote peer. The terminator is appended here.
    async fn write_line(&mut self, line: &str) -> Result<(), Self::Error>;

    /// Closes the connection.
    async fn close(&mut self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// Strips a trailing `\n` or `\r\n` from a raw line.
pub fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
