/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Establishing the connection failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending a line failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving a line failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// No line arrived within the configured read timeout.
    #[error("no line received within {0:?}")]
    TimedOut(std::time::Duration),
}
