//! Session types: the record of one handshake attempt.
//!
//! A session tracks:
//! - WHICH profile is being spoken
//! - WHO is logging in (the player ID, set once)
//! - HOW many password values were sent
//! - WHERE the state machine currently is, and so the outcome

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tourniquet_protocol::{FieldName, Profile};

/// Password values the fixed profile may send: the first try plus one retry.
pub const MAX_PASSWORD_ATTEMPTS: u8 = 2;

// ---------------------------------------------------------------------------
// HandshakeConfig
// ---------------------------------------------------------------------------

/// Configuration for one handshake.
#[derive(Debug, Clone, Default)]
pub struct HandshakeConfig {
    /// Which prompt/response sequence to speak.
    pub profile: Profile,

    /// Player ID to send without asking the operator. `None` collects it
    /// like any other field.
    pub player_id: Option<String>,

    /// Longest wait for one inbound line. A read that takes longer counts
    /// as a transport failure. `None` waits forever.
    pub read_timeout: Option<Duration>,
}

impl HandshakeConfig {
    /// A config for `profile` with no preset ID and no timeout.
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Why access was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The server refused access.
    Server,
    /// The password retry was used up. Decided locally; the server is not
    /// told.
    RetryExhausted,
}

/// Where the handshake state machine is.
///
/// ```text
/// AwaitingId → AwaitingProfileDecision ─┬→ AwaitingPassword → AwaitingPasswordRetry ─┐
///                                        │          │                                 │
///                                        │          └────────────→ AwaitingQr ←───────┘
///                                        │
///                                        └→ AwaitingDynamicField(name) ⟲
///
/// terminal: Authorized | Denied | ConnectionLost | Indeterminate
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The player ID has not been sent yet.
    AwaitingId,
    /// The ID was sent; the first server line decides the path.
    AwaitingProfileDecision,
    /// Fixed profile: collecting and sending the first password.
    AwaitingPassword,
    /// Fixed profile: collecting and sending the retry password.
    AwaitingPasswordRetry,
    /// Fixed profile: collecting and sending the QR code.
    AwaitingQr,
    /// Server-driven profile: answering a request for `name`.
    AwaitingDynamicField(FieldName),
    /// Access granted.
    Authorized,
    /// Access refused.
    Denied(DenyReason),
    /// The transport closed or failed.
    ConnectionLost,
    /// The fixed profile ran out of recognizable prompts without an access
    /// decision.
    Indeterminate,
}

impl SessionState {
    /// Returns `true` once the session can no longer advance.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Authorized
                | Self::Denied(_)
                | Self::ConnectionLost
                | Self::Indeterminate
        )
    }

    /// The outcome this state implies.
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Authorized => Outcome::Authorized,
            Self::Denied(reason) => Outcome::Denied { reason: *reason },
            Self::ConnectionLost => Outcome::ConnectionLost,
            Self::Indeterminate => Outcome::Indeterminate,
            _ => Outcome::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The access decision of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Pending,
    Authorized,
    Denied { reason: DenyReason },
    ConnectionLost,
    Indeterminate,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Authorized => write!(f, "authorized"),
            Self::Denied {
                reason: DenyReason::Server,
            } => write!(f, "denied by server"),
            Self::Denied {
                reason: DenyReason::RetryExhausted,
            } => write!(f, "denied (password attempts exhausted)"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::Indeterminate => write!(f, "ended without a decision"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One handshake attempt, from connection to terminal state.
#[derive(Debug, Clone)]
pub struct Session {
    /// The profile being spoken.
    pub profile: Profile,

    /// The ID sent as `ID_JOUEUR`. Set once.
    pub player_id: Option<String>,

    /// `MOT_DE_PASSE` values sent so far.
    pub password_attempts: u8,

    /// Field responses written to the transport.
    pub responses_sent: usize,

    /// Current state machine position.
    pub state: SessionState,
}

impl Session {
    /// A fresh session in [`SessionState::AwaitingId`].
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            player_id: None,
            password_attempts: 0,
            responses_sent: 0,
            state: SessionState::AwaitingId,
        }
    }

    /// Records the player ID. Returns `false`, leaving the first value in
    /// place, if one was already set.
    pub fn set_player_id(&mut self, id: impl Into<String>) -> bool {
        if self.player_id.is_some() {
            return false;
        }
        self.player_id = Some(id.into());
        true
    }

    /// Moves to `next`. Terminal states are final; later transitions are
    /// ignored.
    pub fn transition(&mut self, next: SessionState) {
        if self.state.is_terminal() {
            tracing::debug!(
                state = ?self.state,
                ignored = ?next,
                "session already terminal"
            );
            return;
        }
        tracing::debug!(from = ?self.state, to = ?next, "session state changed");
        self.state = next;
    }

    /// Returns `true` once the session can no longer advance.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// The current outcome.
    pub fn outcome(&self) -> Outcome {
        self.state.outcome()
    }

    /// A serializable summary of the session.
    pub fn report(&self) -> SessionReport {
        SessionReport {
            profile: self.profile,
            player_id: self.player_id.clone(),
            outcome: self.outcome(),
            password_attempts: self.password_attempts,
            responses_sent: self.responses_sent,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionReport
// ---------------------------------------------------------------------------

/// Summary of a finished handshake, suitable for JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub profile: Profile,
    pub player_id: Option<String>,
    pub outcome: Outcome,
    pub password_attempts: u8,
    pub responses_sent: usize,
}
