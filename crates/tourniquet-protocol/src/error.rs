//! Error types for the protocol layer.
//!
//! Classification itself never fails: a line that matches nothing is
//! informational. These errors only come from parsing names, e.g. a
//! profile given on the command line.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The field name is not one of the enumerated set.
    #[error("unknown field name: {0:?}")]
    UnknownField(String),

    /// The profile name is not `fixed` or `server-driven`.
    #[error("unknown profile: {0:?} (expected \"fixed\" or \"server-driven\")")]
    UnknownProfile(String),
}
