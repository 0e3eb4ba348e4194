//! The handshake state machine.
//!
//! One [`Handshake`] drives one [`Session`] over one connection. The flow
//! is strictly sequential: every write waits for the read before it, and
//! nothing is read after a terminal signal.
//!
//! 1. Send `ID_JOUEUR:<id>`
//! 2. Profile-specific exchange (fixed 3-step or server-driven)
//! 3. Close the connection, whatever state the session ended in

use tourniquet_protocol::{
    Classifier, FieldName, FieldRequest, FieldResponse, FixedClassifier,
    FixedStep, Profile, PromptKind, ServerDrivenClassifier,
};
use tourniquet_transport::{LineConnection, TransportError};

use crate::session::MAX_PASSWORD_ATTEMPTS;
use crate::{
    Collector, DenyReason, HandshakeConfig, Reporter, Session, SessionError,
    SessionEvent, SessionReport, SessionState,
};

/// Drives the client side of the access handshake.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ run() ──→ [Authorized | Denied | ConnectionLost | Indeterminate]
///             │
///             └── connection closed on every exit path
/// ```
pub struct Handshake<C, P, R> {
    conn: C,
    collector: P,
    reporter: R,
    config: HandshakeConfig,
    session: Session,
}

impl<C, P, R> Handshake<C, P, R>
where
    C: LineConnection,
    P: Collector,
    R: Reporter,
{
    /// Creates a handshake over an established connection.
    pub fn new(conn: C, collector: P, reporter: R, config: HandshakeConfig) -> Self {
        let session = Session::new(config.profile);
        Self {
            conn,
            collector,
            reporter,
            config,
            session,
        }
    }

    /// The session as it currently stands.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Gives back the collaborators, e.g. to inspect them after a run.
    pub fn into_parts(self) -> (C, P, R) {
        (self.conn, self.collector, self.reporter)
    }

    /// Runs the handshake to a terminal state and closes the connection.
    ///
    /// Transport failures are not errors: they end the session as
    /// `ConnectionLost` and this still returns `Ok`.
    ///
    /// # Errors
    /// Returns the collector's error if it could not supply a value. The
    /// connection is closed before returning.
    pub async fn run(&mut self) -> Result<SessionReport, SessionError> {
        if self.session.is_terminal() {
            return Ok(self.session.report());
        }

        let conn_id = self.conn.id();
        tracing::info!(%conn_id, profile = %self.config.profile, "handshake started");

        let result = self.drive().await;

        if let Err(e) = self.conn.close().await {
            tracing::debug!(%conn_id, error = %e, "close failed");
        }

        if let Err(e) = result {
            tracing::warn!(%conn_id, error = %e, "handshake aborted");
            return Err(e);
        }

        let outcome = self.session.outcome();
        tracing::info!(%conn_id, %outcome, "handshake finished");
        self.reporter.report(SessionEvent::Finished(outcome));
        Ok(self.session.report())
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        let id = match self.config.player_id.clone() {
            Some(id) => id,
            None => {
                self.collect(&FieldRequest::new(FieldName::IdJoueur))
                    .await?
            }
        };
        let id_response = FieldResponse::new(FieldName::IdJoueur, &id);
        self.session.set_player_id(id_response.value.clone());
        if !self.send(&id_response).await {
            return Ok(());
        }
        self.session.transition(SessionState::AwaitingProfileDecision);

        match self.config.profile {
            Profile::Fixed3Step => self.run_fixed().await,
            Profile::ServerDriven => self.run_server_driven().await,
        }
    }

    // -- Fixed 3-step profile ---------------------------------------------

    async fn run_fixed(&mut self) -> Result<(), SessionError> {
        let first = FixedClassifier::at(FixedStep::PasswordPrompt);
        match self.next_prompt(first).await {
            PromptKind::FieldRequest(req) if req.field == FieldName::MotDePasse => {}
            other => {
                self.settle(other);
                return Ok(());
            }
        }

        self.session.transition(SessionState::AwaitingPassword);
        let Some(reply) = self
            .answer(
                FieldRequest::new(FieldName::MotDePasse),
                FixedStep::AfterPassword,
            )
            .await?
        else {
            return Ok(());
        };

        match reply {
            PromptKind::FieldRequest(req) if req.field == FieldName::QrCode => {
                return self.fixed_qr_step().await;
            }
            PromptKind::FieldRequest(req)
                if req.field == FieldName::MotDePasse
                    && req.retry
                    && self.session.password_attempts < MAX_PASSWORD_ATTEMPTS => {}
            other => {
                self.settle(other);
                return Ok(());
            }
        }

        self.session.transition(SessionState::AwaitingPasswordRetry);
        let Some(reply) = self
            .answer(
                FieldRequest::retry(FieldName::MotDePasse),
                FixedStep::AfterRetry,
            )
            .await?
        else {
            return Ok(());
        };

        if reply.requested_field() == Some(FieldName::QrCode) {
            return self.fixed_qr_step().await;
        }

        tracing::warn!(
            attempts = self.session.password_attempts,
            "password attempts exhausted, account blocked"
        );
        self.session
            .transition(SessionState::Denied(DenyReason::RetryExhausted));
        self.reporter.report(SessionEvent::RetryExhausted);
        Ok(())
    }

    async fn fixed_qr_step(&mut self) -> Result<(), SessionError> {
        self.session.transition(SessionState::AwaitingQr);
        if let Some(result) = self
            .answer(FieldRequest::new(FieldName::QrCode), FixedStep::QrResult)
            .await?
        {
            self.settle(result);
        }
        Ok(())
    }

    /// Ends a fixed-profile session on a line that does not continue the
    /// sequence.
    fn settle(&mut self, kind: PromptKind) {
        let next = match kind {
            PromptKind::TerminalAuthorized => SessionState::Authorized,
            PromptKind::TerminalDenied => SessionState::Denied(DenyReason::Server),
            // Already ConnectionLost.
            PromptKind::EndOfStream => return,
            PromptKind::FieldRequest(_) | PromptKind::Informational => {
                tracing::info!(
                    state = ?self.session.state,
                    "no recognizable prompt, ending without a decision"
                );
                SessionState::Indeterminate
            }
        };
        self.session.transition(next);
    }

    // -- Server-driven profile --------------------------------------------

    async fn run_server_driven(&mut self) -> Result<(), SessionError> {
        loop {
            match self.next_prompt(ServerDrivenClassifier).await {
                PromptKind::EndOfStream => return Ok(()),
                PromptKind::TerminalAuthorized => {
                    self.session.transition(SessionState::Authorized);
                    return Ok(());
                }
                PromptKind::TerminalDenied => {
                    self.session
                        .transition(SessionState::Denied(DenyReason::Server));
                    return Ok(());
                }
                PromptKind::Informational => continue,
                PromptKind::FieldRequest(req) => {
                    self.session
                        .transition(SessionState::AwaitingDynamicField(req.field));
                    let value = self.collect(&req).await?;
                    if req.field == FieldName::MotDePasse {
                        self.session.password_attempts += 1;
                    }
                    if !self.send(&FieldResponse::new(req.field, &value)).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    // -- Shared steps -----------------------------------------------------

    /// Collects a value for `request`, sends it, and reads the reply as
    /// seen from `reply_step`.
    ///
    /// Returns `None` if the connection was lost on the way.
    async fn answer(
        &mut self,
        request: FieldRequest,
        reply_step: FixedStep,
    ) -> Result<Option<PromptKind>, SessionError> {
        let value = self.collect(&request).await?;
        if request.field == FieldName::MotDePasse {
            self.session.password_attempts += 1;
        }
        if !self.send(&FieldResponse::new(request.field, &value)).await {
            return Ok(None);
        }
        match self.next_prompt(FixedClassifier::at(reply_step)).await {
            PromptKind::EndOfStream => Ok(None),
            kind => Ok(Some(kind)),
        }
    }

    async fn collect(
        &mut self,
        request: &FieldRequest,
    ) -> Result<String, SessionError> {
        tracing::debug!(field = %request.field, retry = request.retry, "collecting value");
        self.collector.collect(request).await
    }

    /// Writes one response. Returns `false` if the connection was lost.
    async fn send(&mut self, response: &FieldResponse) -> bool {
        match self.conn.write_line(&response.encode()).await {
            Ok(()) => {
                self.session.responses_sent += 1;
                tracing::debug!(line = %response.redacted(), "sent");
                true
            }
            Err(e) => {
                self.lose_connection(format!("write failed: {e}"));
                false
            }
        }
    }

    /// Reads the next line and classifies it with `classifier`. Every
    /// received line is shown to the operator. A failed or closed read
    /// yields `EndOfStream` with the session already marked
    /// `ConnectionLost`.
    async fn next_prompt(&mut self, classifier: impl Classifier) -> PromptKind {
        let read = match self.config.read_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.conn.read_line()).await {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(_) => Err(TransportError::TimedOut(limit).to_string()),
                }
            }
            None => self.conn.read_line().await.map_err(|e| e.to_string()),
        };

        let line = match read {
            Ok(line) => line,
            Err(reason) => {
                self.lose_connection(reason);
                return PromptKind::EndOfStream;
            }
        };

        let kind = classifier.classify(line.as_deref());
        match line {
            Some(line) => {
                tracing::debug!(%line, ?kind, "received");
                self.reporter.report(SessionEvent::ServerLine(line));
            }
            None => self.lose_connection("connection closed by server".into()),
        }
        kind
    }

    fn lose_connection(&mut self, reason: String) {
        tracing::warn!(
            conn_id = %self.conn.id(),
            state = ?self.session.state,
            %reason,
            "connection lost"
        );
        self.session.transition(SessionState::ConnectionLost);
        self.reporter.report(SessionEvent::ConnectionLost(reason));
    }
}
