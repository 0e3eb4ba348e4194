//! # Tourniquet
//!
//! Client for a line-based access handshake: the prompts and answers that
//! stand between a player and a game session.
//!
//! Two handshake profiles are supported:
//! - **fixed**: ID, password with one retry, then QR code, against a
//!   server that speaks prose.
//! - **server-driven**: the server asks for fields in any order with
//!   `NAME:?` lines and ends with `ACCES AUTORISE` / `ACCES REFUSE`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tourniquet::prelude::*;
//!
//! # async fn demo() -> Result<(), TourniquetError> {
//! let client = ClientBuilder::new()
//!     .host("localhost")
//!     .port(11000)
//!     .profile(Profile::ServerDriven)
//!     .connect()
//!     .await?;
//!
//! let collector = ConsoleCollector::stdin(Box::new(std::io::stdout()));
//! let reporter = ConsoleReporter::new(std::io::stdout());
//! let report = client.run(collector, reporter).await?;
//! println!("{}", report.outcome);
//! # Ok(())
//! # }
//! ```

mod client;
mod console;
mod error;

pub use client::{Client, ClientBuilder, DEFAULT_HOST, DEFAULT_PORT};
pub use console::{ConsoleCollector, ConsoleReporter};
pub use error::TourniquetError;

pub mod prelude {
    //! Everything needed to connect and run a handshake.

    pub use crate::{
        Client, ClientBuilder, ConsoleCollector, ConsoleReporter,
        TourniquetError,
    };
    pub use tourniquet_protocol::{
        FieldName, FieldRequest, FieldResponse, Profile, PromptKind,
    };
    pub use tourniquet_session::{
        Collector, DenyReason, Handshake, HandshakeConfig, Outcome, Reporter,
        SessionError, SessionEvent, SessionReport, SilentReporter,
    };
    pub use tourniquet_transport::{
        LineConnection, TcpLineConnection, TransportError,
    };
}
