//! Wire vocabulary for Tourniquet.
//!
//! This crate defines what the client and the access server say to each
//! other, independent of how lines move:
//!
//! - **Types** ([`FieldName`], [`FieldRequest`], [`FieldResponse`],
//!   [`PromptKind`], [`Profile`]): the outbound `FIELD_NAME:VALUE` lines
//!   and the meaning of inbound lines.
//! - **Classifiers** ([`Classifier`], [`FixedClassifier`],
//!   [`ServerDrivenClassifier`]): how a raw inbound line becomes a
//!   [`PromptKind`] for each profile.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (lines) → Protocol (PromptKind) → Session (state machine)
//! ```

mod classify;
mod error;
mod types;

pub use classify::{
    Classifier, FixedClassifier, FixedStep, ServerDrivenClassifier, normalize,
};
pub use error::ProtocolError;
pub use types::{FieldName, FieldRequest, FieldResponse, Profile, PromptKind};
