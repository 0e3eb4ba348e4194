//! Integration tests for the handshake state machine using scripted
//! collaborators.
//!
//! The connection replays a fixed list of server lines and records every
//! line the client writes. The collector hands out queued operator values.
//! Nothing touches a socket or a terminal.

use std::collections::VecDeque;
use std::time::Duration;

use tourniquet_protocol::{FieldName, FieldRequest, Profile};
use tourniquet_session::{
    Collector, DenyReason, Handshake, HandshakeConfig, Outcome, SessionError,
    SessionEvent, SessionState,
};
use tourniquet_transport::{ConnectionId, LineConnection, TransportError};

// =========================================================================
// Scripted collaborators
// =========================================================================

#[derive(Default)]
struct ScriptedConnection {
    inbound: VecDeque<String>,
    outbound: Vec<String>,
    /// Writes beyond this many fail with a broken pipe.
    fail_writes_after: Option<usize>,
    /// Reads never complete.
    stall: bool,
    closed: bool,
}

impl ScriptedConnection {
    fn new(lines: &[&str]) -> Self {
        Self {
            inbound: lines.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl LineConnection for ScriptedConnection {
    type Error = TransportError;

    async fn read_line(&mut self) -> Result<Option<String>, Self::Error> {
        if self.stall {
            std::future::pending::<()>().await;
        }
        Ok(self.inbound.pop_front())
    }

    async fn write_line(&mut self, line: &str) -> Result<(), Self::Error> {
        if let Some(limit) = self.fail_writes_after {
            if self.outbound.len() >= limit {
                return Err(TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "peer gone",
                )));
            }
        }
        self.outbound.push(line.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.closed = true;
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        ConnectionId::new(99)
    }
}

#[derive(Default)]
struct ScriptedCollector {
    values: VecDeque<String>,
    requests: Vec<FieldRequest>,
}

impl ScriptedCollector {
    fn new(values: &[&str]) -> Self {
        Self {
            values: values.iter().map(|s| s.to_string()).collect(),
            requests: Vec::new(),
        }
    }
}

impl Collector for ScriptedCollector {
    async fn collect(
        &mut self,
        request: &FieldRequest,
    ) -> Result<String, SessionError> {
        self.requests.push(request.clone());
        self.values
            .pop_front()
            .ok_or(SessionError::InputClosed(request.field))
    }
}

type TestHandshake =
    Handshake<ScriptedConnection, ScriptedCollector, Vec<SessionEvent>>;

fn handshake(
    profile: Profile,
    server: &[&str],
    operator: &[&str],
) -> TestHandshake {
    Handshake::new(
        ScriptedConnection::new(server),
        ScriptedCollector::new(operator),
        Vec::new(),
        HandshakeConfig::new(profile),
    )
}

fn count_prefix(lines: &[String], prefix: &str) -> usize {
    lines.iter().filter(|l| l.starts_with(prefix)).count()
}

// =========================================================================
// Server-driven profile
// =========================================================================

#[tokio::test]
async fn test_server_driven_end_to_end_authorized() {
    let mut hs = handshake(
        Profile::ServerDriven,
        &["DATE_NAISSANCE:", "NOM_EQUIPE:?", "ACCES AUTORISE"],
        &["158", "2000-01-01", "Red"],
    );

    let report = hs.run().await.expect("handshake should complete");

    assert_eq!(report.outcome, Outcome::Authorized);
    assert_eq!(report.player_id.as_deref(), Some("158"));
    assert_eq!(report.responses_sent, 3);
    assert_eq!(hs.session().state, SessionState::Authorized);

    let (conn, _, _) = hs.into_parts();
    assert_eq!(
        conn.outbound,
        vec![
            "ID_JOUEUR:158",
            "DATE_NAISSANCE:2000-01-01",
            "NOM_EQUIPE:Red",
        ]
    );
    assert!(conn.closed);
}

#[tokio::test]
async fn test_server_driven_answers_requests_in_arrival_order() {
    let mut hs = handshake(
        Profile::ServerDriven,
        &[
            "Bienvenue",
            "QR_CODE:?",
            "NOM_EQUIPE:?",
            "Vérification en cours",
            "MOT_DE_PASSE:?",
            "DATE_NAISSANCE:AAAA-MM-JJ",
            "ACCES AUTORISE",
        ],
        &["7", "ABC123XYZ", "Blue", "0000", " 1999-12-31 "],
    );

    let report = hs.run().await.unwrap();
    assert_eq!(report.outcome, Outcome::Authorized);
    assert_eq!(report.password_attempts, 1);

    let (conn, collector, _) = hs.into_parts();
    assert_eq!(
        conn.outbound,
        vec![
            "ID_JOUEUR:7",
            "QR_CODE:ABC123XYZ",
            "NOM_EQUIPE:Blue",
            "MOT_DE_PASSE:0000",
            "DATE_NAISSANCE:1999-12-31",
        ]
    );

    // The date cue is handed to the collector.
    let date_request = collector
        .requests
        .iter()
        .find(|r| r.field == FieldName::DateNaissance)
        .expect("date was requested");
    assert_eq!(date_request.cue.as_deref(), Some("AAAA-MM-JJ"));
}

#[tokio::test]
async fn test_server_driven_repeated_request_is_answered_again() {
    let mut hs = handshake(
        Profile::ServerDriven,
        &["QR_CODE:?", "QR_CODE:?", "ACCES REFUSE"],
        &["1", "bad", "worse"],
    );

    hs.run().await.unwrap();

    let (conn, _, _) = hs.into_parts();
    assert_eq!(count_prefix(&conn.outbound, "QR_CODE:"), 2);
}

#[tokio::test]
async fn test_server_driven_stops_at_first_terminal_signal() {
    let mut hs = handshake(
        Profile::ServerDriven,
        &["NOM_EQUIPE:?", "ACCES REFUSE: equipe inconnue", "QR_CODE:?"],
        &["1", "Red", "never used"],
    );

    let report = hs.run().await.unwrap();
    assert_eq!(
        report.outcome,
        Outcome::Denied {
            reason: DenyReason::Server
        }
    );

    let (conn, collector, _) = hs.into_parts();
    assert_eq!(conn.outbound, vec!["ID_JOUEUR:1", "NOM_EQUIPE:Red"]);
    // Nothing is read after the terminal line.
    assert_eq!(conn.inbound, vec!["QR_CODE:?"]);
    assert_eq!(collector.values, vec!["never used"]);
}

#[tokio::test]
async fn test_server_driven_end_of_stream_is_connection_lost() {
    let mut hs = handshake(
        Profile::ServerDriven,
        &["DATE_NAISSANCE:"],
        &["1", "2000-01-01"],
    );

    let report = hs.run().await.unwrap();

    assert_eq!(report.outcome, Outcome::ConnectionLost);
    let (conn, _, events) = hs.into_parts();
    assert_eq!(conn.outbound.len(), 2);
    assert!(conn.closed);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::ConnectionLost(reason) if reason.contains("closed")
    )));
}

#[tokio::test]
async fn test_server_driven_write_failure_is_connection_lost() {
    let mut conn = ScriptedConnection::new(&[
        "NOM_EQUIPE:?",
        "QR_CODE:?",
        "ACCES AUTORISE",
    ]);
    conn.fail_writes_after = Some(1);
    let mut hs = Handshake::new(
        conn,
        ScriptedCollector::new(&["1", "Red", "QR"]),
        Vec::new(),
        HandshakeConfig::new(Profile::ServerDriven),
    );

    let report = hs.run().await.unwrap();

    assert_eq!(report.outcome, Outcome::ConnectionLost);
    assert_eq!(report.responses_sent, 1);
    let (conn, _, events) = hs.into_parts();
    assert_eq!(conn.outbound, vec!["ID_JOUEUR:1"]);
    // No read was attempted after the failed write.
    assert_eq!(conn.inbound, vec!["QR_CODE:?", "ACCES AUTORISE"]);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::ConnectionLost(reason) if reason.contains("peer gone")
    )));
}

// =========================================================================
// Fixed 3-step profile
// =========================================================================

#[tokio::test]
async fn test_fixed_happy_path_against_real_server_prose() {
    let mut hs = handshake(
        Profile::Fixed3Step,
        &[
            "Joueur trouvé, veuillez entrer le mot de passe",
            "Mot de passe conforme, veuillez scanner le code QR",
            "Accès autorisé, ouverture porte",
        ],
        &["158", "1234", "ABC123XYZ"],
    );

    let report = hs.run().await.unwrap();

    assert_eq!(report.outcome, Outcome::Authorized);
    assert_eq!(report.password_attempts, 1);
    let (conn, _, events) = hs.into_parts();
    assert_eq!(
        conn.outbound,
        vec!["ID_JOUEUR:158", "MOT_DE_PASSE:1234", "QR_CODE:ABC123XYZ"]
    );
    assert_eq!(events.last(), Some(&SessionEvent::Finished(Outcome::Authorized)));
}

#[tokio::test]
async fn test_fixed_retry_then_qr_sends_two_passwords_and_one_qr() {
    let mut hs = handshake(
        Profile::Fixed3Step,
        &["mot de passe", "tentative 1/2", "qr", "Accès autorisé"],
        &["158", "wrong", "1234", "ABC123XYZ"],
    );

    let report = hs.run().await.unwrap();

    assert_ne!(
        report.outcome,
        Outcome::Denied {
            reason: DenyReason::RetryExhausted
        }
    );
    assert_eq!(report.outcome, Outcome::Authorized);
    assert_eq!(report.password_attempts, 2);

    let (conn, collector, events) = hs.into_parts();
    assert_eq!(
        conn.outbound,
        vec![
            "ID_JOUEUR:158",
            "MOT_DE_PASSE:wrong",
            "MOT_DE_PASSE:1234",
            "QR_CODE:ABC123XYZ",
        ]
    );
    assert!(!events.contains(&SessionEvent::RetryExhausted));
    // The second password prompt is marked as a retry.
    assert!(collector.requests[2].retry);
}

#[tokio::test]
async fn test_fixed_password_prompt_mentioning_qr_asks_for_password() {
    let mut hs = handshake(
        Profile::Fixed3Step,
        &[
            "Entrez le mot de passe, le QR sera demande ensuite",
            "code qr",
            "Accès autorisé",
        ],
        &["1", "pw", "code"],
    );

    let report = hs.run().await.unwrap();

    assert_eq!(report.outcome, Outcome::Authorized);
    let (conn, _, _) = hs.into_parts();
    assert_eq!(
        conn.outbound,
        vec!["ID_JOUEUR:1", "MOT_DE_PASSE:pw", "QR_CODE:code"]
    );
}

#[tokio::test]
async fn test_fixed_qr_prompt_after_retry_wins_over_refusal_wording() {
    let mut hs = handshake(
        Profile::Fixed3Step,
        &[
            "mot de passe",
            "tentative 1/2",
            "Ancien mot de passe refusé, nouveau accepté: scannez le code QR",
            "Accès autorisé",
        ],
        &["158", "old", "new", "ABC123XYZ"],
    );

    let report = hs.run().await.unwrap();

    assert_eq!(report.outcome, Outcome::Authorized);
    assert_eq!(report.password_attempts, 2);
    let (conn, _, events) = hs.into_parts();
    assert_eq!(count_prefix(&conn.outbound, "MOT_DE_PASSE:"), 2);
    assert_eq!(count_prefix(&conn.outbound, "QR_CODE:"), 1);
    assert!(!events.contains(&SessionEvent::RetryExhausted));
}

#[tokio::test]
async fn test_fixed_unblocked_account_proceeds_to_qr() {
    let mut hs = handshake(
        Profile::Fixed3Step,
        &[
            "mot de passe",
            "Compte débloqué, veuillez scanner le code QR",
            "Accès autorisé",
        ],
        &["158", "1234", "ABC123XYZ"],
    );

    let report = hs.run().await.unwrap();

    assert_eq!(report.outcome, Outcome::Authorized);
    let (conn, _, _) = hs.into_parts();
    assert_eq!(conn.outbound.last().map(String::as_str), Some("QR_CODE:ABC123XYZ"));
}

#[tokio::test]
async fn test_fixed_retry_then_no_qr_is_local_denial() {
    let mut hs = handshake(
        Profile::Fixed3Step,
        &[
            "mot de passe",
            "tentative 1/2",
            "Mot de passe erroné, tentative 2/2",
            "Compte bloqué après 2 tentatives",
        ],
        &["158", "a", "b", "never used"],
    );

    let report = hs.run().await.unwrap();

    assert_eq!(
        report.outcome,
        Outcome::Denied {
            reason: DenyReason::RetryExhausted
        }
    );
    let (conn, collector, events) = hs.into_parts();
    assert_eq!(count_prefix(&conn.outbound, "MOT_DE_PASSE:"), 2);
    assert_eq!(conn.outbound.last().map(String::as_str), Some("MOT_DE_PASSE:b"));
    // Only the reply to the second password was read.
    assert_eq!(conn.inbound.len(), 1);
    assert_eq!(collector.values, vec!["never used"]);
    assert!(events.contains(&SessionEvent::RetryExhausted));
    assert!(conn.closed);
}

#[tokio::test]
async fn test_fixed_second_retry_notice_is_not_honored() {
    // A server that keeps inviting retries does not get a third password.
    let mut hs = handshake(
        Profile::Fixed3Step,
        &["mot de passe", "tentative 1/2", "tentative 1/2"],
        &["1", "a", "b", "c"],
    );

    let report = hs.run().await.unwrap();

    assert_eq!(report.password_attempts, 2);
    assert_eq!(
        report.outcome,
        Outcome::Denied {
            reason: DenyReason::RetryExhausted
        }
    );
}

#[tokio::test]
async fn test_fixed_unrecognized_first_reply_is_indeterminate() {
    let mut hs = handshake(
        Profile::Fixed3Step,
        &["Joueur introuvable ou inactif"],
        &["999"],
    );

    let report = hs.run().await.unwrap();

    assert_eq!(report.outcome, Outcome::Indeterminate);
    let (conn, _, events) = hs.into_parts();
    assert_eq!(conn.outbound, vec!["ID_JOUEUR:999"]);
    assert_eq!(
        events,
        vec![
            SessionEvent::ServerLine("Joueur introuvable ou inactif".into()),
            SessionEvent::Finished(Outcome::Indeterminate),
        ]
    );
}

#[tokio::test]
async fn test_fixed_unrecognized_reply_after_password_is_indeterminate() {
    let mut hs = handshake(
        Profile::Fixed3Step,
        &["mot de passe", "Format invalide"],
        &["1", "pw"],
    );

    let report = hs.run().await.unwrap();

    assert_eq!(report.outcome, Outcome::Indeterminate);
    assert_eq!(report.password_attempts, 1);
}

#[tokio::test]
async fn test_fixed_qr_refusal_is_server_denial() {
    let mut hs = handshake(
        Profile::Fixed3Step,
        &[
            "veuillez entrer le mot de passe",
            "veuillez scanner le code QR",
            "QR déjà utilisé, accès refusé",
        ],
        &["158", "1234", "ZED900AAA"],
    );

    let report = hs.run().await.unwrap();

    assert_eq!(
        report.outcome,
        Outcome::Denied {
            reason: DenyReason::Server
        }
    );
}

#[tokio::test]
async fn test_fixed_informational_qr_result_is_indeterminate() {
    let mut hs = handshake(
        Profile::Fixed3Step,
        &["mot de passe", "code qr", "Erreur serveur, réessayez plus tard"],
        &["1", "pw", "code"],
    );

    let report = hs.run().await.unwrap();

    assert_eq!(report.outcome, Outcome::Indeterminate);
}

#[tokio::test]
async fn test_fixed_end_of_stream_at_each_step_halts_writes() {
    let scripts: Vec<(Vec<&str>, usize)> = vec![
        (vec![], 1),
        (vec!["mot de passe"], 2),
        (vec!["mot de passe", "tentative 1/2"], 3),
        (vec!["mot de passe", "qr"], 3),
    ];

    for (server, expected_writes) in scripts {
        let mut hs = handshake(
            Profile::Fixed3Step,
            &server,
            &["1", "a", "b", "c"],
        );

        let report = hs.run().await.unwrap();

        assert_eq!(report.outcome, Outcome::ConnectionLost, "{server:?}");
        let (conn, _, _) = hs.into_parts();
        assert_eq!(conn.outbound.len(), expected_writes, "{server:?}");
        assert!(conn.closed);
    }
}

// =========================================================================
// Configuration and collaborator failures
// =========================================================================

#[tokio::test]
async fn test_preset_player_id_is_not_collected() {
    let mut config = HandshakeConfig::new(Profile::ServerDriven);
    config.player_id = Some("  158 ".into());
    let mut hs = Handshake::new(
        ScriptedConnection::new(&["ACCES AUTORISE"]),
        ScriptedCollector::new(&[]),
        Vec::new(),
        config,
    );

    let report = hs.run().await.unwrap();

    assert_eq!(report.player_id.as_deref(), Some("158"));
    let (conn, collector, _) = hs.into_parts();
    assert_eq!(conn.outbound, vec!["ID_JOUEUR:158"]);
    assert!(collector.requests.is_empty());
}

#[tokio::test]
async fn test_closed_operator_input_aborts_and_closes_connection() {
    let mut hs = handshake(
        Profile::Fixed3Step,
        &["mot de passe", "qr"],
        &["158"],
    );

    let result = hs.run().await;

    assert!(matches!(
        result,
        Err(SessionError::InputClosed(FieldName::MotDePasse))
    ));
    assert_eq!(hs.session().outcome(), Outcome::Pending);
    let (conn, _, events) = hs.into_parts();
    assert!(conn.closed);
    assert_eq!(conn.outbound, vec!["ID_JOUEUR:158"]);
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Finished(_))));
}

#[tokio::test(start_paused = true)]
async fn test_read_timeout_is_connection_lost() {
    let mut conn = ScriptedConnection::new(&["never delivered"]);
    conn.stall = true;
    let mut config = HandshakeConfig::new(Profile::ServerDriven);
    config.read_timeout = Some(Duration::from_secs(5));
    let mut hs =
        Handshake::new(conn, ScriptedCollector::new(&["1"]), Vec::new(), config);

    let report = hs.run().await.unwrap();

    assert_eq!(report.outcome, Outcome::ConnectionLost);
    let (_, _, events) = hs.into_parts();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::ConnectionLost(reason) if reason.contains("5s")
    )));
}

#[tokio::test]
async fn test_every_server_line_is_reported_before_finish() {
    let mut hs = handshake(
        Profile::ServerDriven,
        &["Bienvenue", "NOM_EQUIPE:?", "ACCES AUTORISE"],
        &["1", "Red"],
    );

    hs.run().await.unwrap();

    let (_, _, events) = hs.into_parts();
    assert_eq!(
        events,
        vec![
            SessionEvent::ServerLine("Bienvenue".into()),
            SessionEvent::ServerLine("NOM_EQUIPE:?".into()),
            SessionEvent::ServerLine("ACCES AUTORISE".into()),
            SessionEvent::Finished(Outcome::Authorized),
        ]
    );
}
