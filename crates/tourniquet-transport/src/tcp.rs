//! TCP line transport implementation using `tokio::net::TcpStream`.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::{ConnectionId, LineConnection, TransportError, trim_line_ending};

/// Longest inbound line accepted, terminator included.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// A [`LineConnection`] over a TCP stream.
///
/// The stream is split so that the buffered reader keeps any bytes that
/// arrived past the current line for the next call. After [`close`], reads
/// and writes fail with [`TransportError::ConnectionClosed`].
///
/// [`close`]: LineConnection::close
pub struct TcpLineConnection {
    id: ConnectionId,
    peer: SocketAddr,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    closed: bool,
}

impl TcpLineConnection {
    /// Connects to `addr` (`host:port`).
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await.map_err(|source| {
            TransportError::ConnectFailed {
                addr: addr.to_string(),
                source,
            }
        })?;
        let conn = Self::from_stream(stream).map_err(|source| {
            TransportError::ConnectFailed {
                addr: addr.to_string(),
                source,
            }
        })?;
        tracing::info!(id = %conn.id, peer = %conn.peer, "TCP connection established");
        Ok(conn)
    }

    /// Wraps an already-connected stream.
    pub fn from_stream(stream: TcpStream) -> std::io::Result<Self> {
        let peer = stream.peer_addr()?;
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            id: ConnectionId::next(),
            peer,
            reader: BufReader::new(read_half),
            writer,
            closed: false,
        })
    }

    /// Returns the address of the remote peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed(format!(
                "{} was closed locally",
                self.id
            )));
        }
        Ok(())
    }
}

impl LineConnection for TcpLineConnection {
    type Error = TransportError;

    async fn read_line(&mut self) -> Result<Option<String>, Self::Error> {
        self.ensure_open()?;
        let mut buf = Vec::new();
        let n = (&mut self.reader)
            .take(MAX_LINE_BYTES as u64)
            .read_until(b'\n', &mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
            tracing::warn!(id = %self.id, limit = MAX_LINE_BYTES, "inbound line too long");
            return Err(TransportError::ReceiveFailed(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("line exceeds {MAX_LINE_BYTES} bytes"),
            )));
        }
        if n == 0 {
            tracing::debug!(id = %self.id, "peer closed the connection");
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&buf);
        Ok(Some(trim_line_ending(&text).to_string()))
    }

    async fn write_line(&mut self, line: &str) -> Result<(), Self::Error> {
        self.ensure_open()?;
        let mut framed = String::with_capacity(line.len() + 1);
        framed.push_str(line);
        framed.push('\n');
        self.writer
            .write_all(framed.as_bytes())
            .await
            .map_err(TransportError::SendFailed)?;
        self.writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        tracing::debug!(id = %self.id, "closing TCP connection");
        self.writer
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
