//! Collaborator hooks: where field values come from and where progress goes.
//!
//! The handshake doesn't read a terminal or print anything itself. It asks
//! a [`Collector`] for each value and tells a [`Reporter`] what happened.
//! The binary plugs in console implementations; tests plug in scripted
//! ones, so the state machine runs without real terminal I/O.

use tourniquet_protocol::FieldRequest;

use crate::{Outcome, SessionError};

/// Supplies the value for each field the handshake needs.
///
/// # Example
///
/// ```rust
/// use tourniquet_protocol::FieldRequest;
/// use tourniquet_session::{Collector, SessionError};
///
/// /// Answers every request with the same badge number.
/// struct Kiosk(String);
///
/// impl Collector for Kiosk {
///     async fn collect(
///         &mut self,
///         _request: &FieldRequest,
///     ) -> Result<String, SessionError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
pub trait Collector: Send {
    /// Blocks until a value for `request` is available.
    ///
    /// The returned text is trimmed by the caller before it is sent.
    ///
    /// # Errors
    /// Return [`SessionError::InputClosed`] when no more values will come;
    /// the handshake stops and closes the connection.
    async fn collect(
        &mut self,
        request: &FieldRequest,
    ) -> Result<String, SessionError>;
}

/// Something the operator should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A line received from the server, verbatim.
    ServerLine(String),
    /// The password retry failed; the account is considered blocked.
    RetryExhausted,
    /// The transport closed or failed, with a human-readable reason.
    ConnectionLost(String),
    /// The handshake ended.
    Finished(Outcome),
}

/// Receives [`SessionEvent`]s as the handshake runs.
pub trait Reporter: Send {
    /// Called once per event, in order.
    fn report(&mut self, event: SessionEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn report(&mut self, _event: SessionEvent) {}
}

impl Reporter for Vec<SessionEvent> {
    fn report(&mut self, event: SessionEvent) {
        self.push(event);
    }
}
