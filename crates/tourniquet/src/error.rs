//! Unified error type for the Tourniquet client.

use tourniquet_protocol::ProtocolError;
use tourniquet_session::SessionError;
use tourniquet_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `tourniquet` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum TourniquetError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (unknown field or profile name).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (operator input unavailable).
    #[error(transparent)]
    Session(#[from] SessionError),
}
