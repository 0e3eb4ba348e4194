//! Error types for the session layer.

/// Errors that abort a handshake.
///
/// Transport failures are not here: they end the session with
/// [`Outcome::ConnectionLost`](crate::Outcome::ConnectionLost) instead of
/// an error. What remains are failures on the operator side, where no
/// value can be sent at all.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operator's input source is closed (e.g. stdin reached EOF).
    #[error("operator input closed while waiting for {0}")]
    InputClosed(tourniquet_protocol::FieldName),

    /// The collector failed to produce a value.
    #[error("could not collect {field}: {reason}")]
    Collector {
        field: tourniquet_protocol::FieldName,
        reason: String,
    },
}
