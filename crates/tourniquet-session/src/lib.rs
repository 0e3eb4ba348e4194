//! Client handshake for Tourniquet.
//!
//! This crate runs the prompt/response dialogue that gates access:
//!
//! 1. **Session model**: what one attempt looks like ([`Session`],
//!    [`SessionState`], [`Outcome`])
//! 2. **Collaborators**: where values come from ([`Collector`]) and where
//!    progress goes ([`Reporter`])
//! 3. **State machine**: the fixed 3-step and server-driven profiles
//!    ([`Handshake`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)  ← connects, picks collaborators, runs the handshake
//!     ↕
//! Session Layer (this crate)  ← decides what to send and when to stop
//!     ↕
//! Protocol (below)  ← FieldName, PromptKind, classifiers
//! Transport (below) ← LineConnection
//! ```

#![allow(async_fn_in_trait)]

mod collector;
mod error;
mod handshake;
mod session;

pub use collector::{Collector, Reporter, SessionEvent, SilentReporter};
pub use error::SessionError;
pub use handshake::Handshake;
pub use session::{
    DenyReason, HandshakeConfig, MAX_PASSWORD_ATTEMPTS, Outcome, Session,
    SessionReport, SessionState,
};
