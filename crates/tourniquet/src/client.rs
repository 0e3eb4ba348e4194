//! `ClientBuilder` and client entry point.
//!
//! This ties the layers together: connection establishment from host/port
//! configuration, then the handshake over that connection.

use std::time::Duration;

use tourniquet_protocol::Profile;
use tourniquet_session::{
    Collector, Handshake, HandshakeConfig, Reporter, SessionReport,
};
use tourniquet_transport::TcpLineConnection;

use crate::TourniquetError;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "localhost";

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 11000;

/// Builder for configuring and connecting a Tourniquet client.
///
/// # Example
///
/// ```rust,ignore
/// use tourniquet::prelude::*;
///
/// let client = ClientBuilder::new()
///     .host("gate.local")
///     .profile(Profile::ServerDriven)
///     .connect()
///     .await?;
/// let report = client.run(my_collector, my_reporter).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    host: String,
    port: u16,
    handshake: HandshakeConfig,
}

impl ClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            handshake: HandshakeConfig::default(),
        }
    }

    /// Sets the server host name or address.
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Sets the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the handshake profile.
    pub fn profile(mut self, profile: Profile) -> Self {
        self.handshake.profile = profile;
        self
    }

    /// Sends this player ID instead of asking the operator for one.
    pub fn player_id(mut self, id: &str) -> Self {
        self.handshake.player_id = Some(id.to_string());
        self
    }

    /// Limits how long to wait for each server line.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.handshake.read_timeout = Some(timeout);
        self
    }

    /// The `host:port` this builder connects to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Opens the connection.
    ///
    /// # Errors
    /// Returns [`TourniquetError::Transport`] if the server is unreachable.
    pub async fn connect(self) -> Result<Client, TourniquetError> {
        let addr = self.addr();
        let conn = TcpLineConnection::connect(&addr).await?;
        Ok(Client {
            addr,
            conn,
            handshake: self.handshake,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A connected client, ready to run one handshake.
pub struct Client {
    addr: String,
    conn: TcpLineConnection,
    handshake: HandshakeConfig,
}

impl Client {
    /// The `host:port` this client connected to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Runs the handshake to completion. The connection is closed when
    /// this returns, whatever the outcome.
    ///
    /// # Errors
    /// Returns [`TourniquetError::Session`] if the collector could not
    /// supply a value. Transport failures are reported through the
    /// returned [`SessionReport`] as `ConnectionLost`.
    pub async fn run<P, R>(
        self,
        collector: P,
        reporter: R,
    ) -> Result<SessionReport, TourniquetError>
    where
        P: Collector,
        R: Reporter,
    {
        tracing::info!(addr = %self.addr, profile = %self.handshake.profile, "starting handshake");
        let mut handshake =
            Handshake::new(self.conn, collector, reporter, self.handshake);
        Ok(handshake.run().await?)
    }
}
