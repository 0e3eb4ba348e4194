//! Core protocol types for Tourniquet's line format.
//!
//! Every outbound message is a single `FIELD_NAME:VALUE` line. Inbound lines
//! are free text until a classifier (see [`crate::Classifier`]) tags them
//! with a [`PromptKind`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// FieldName
// ---------------------------------------------------------------------------

/// The fixed set of field names the client can send.
///
/// Serialized as the wire name (`"ID_JOUEUR"`, `"MOT_DE_PASSE"`, ...), so a
/// JSON report reads the same as the traffic it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldName {
    /// Player identifier. Always the first line the client sends.
    IdJoueur,
    /// Account password.
    MotDePasse,
    /// Ticket QR code.
    QrCode,
    /// Birth date, requested by the server-driven profile.
    DateNaissance,
    /// Team name, requested by the server-driven profile.
    NomEquipe,
}

impl FieldName {
    /// Every field name, in wire order of the fixed profile.
    pub const ALL: [FieldName; 5] = [
        FieldName::IdJoueur,
        FieldName::MotDePasse,
        FieldName::QrCode,
        FieldName::DateNaissance,
        FieldName::NomEquipe,
    ];

    /// The name as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IdJoueur => "ID_JOUEUR",
            Self::MotDePasse => "MOT_DE_PASSE",
            Self::QrCode => "QR_CODE",
            Self::DateNaissance => "DATE_NAISSANCE",
            Self::NomEquipe => "NOM_EQUIPE",
        }
    }

    /// Returns `true` for values that must never appear in logs.
    pub fn is_secret(self) -> bool {
        matches!(self, Self::MotDePasse)
    }

    /// The operator-facing prompt for this field.
    pub fn prompt_label(self) -> &'static str {
        match self {
            Self::IdJoueur => "Entrez l'ID du joueur : ",
            Self::MotDePasse => "Entrez le mot de passe : ",
            Self::QrCode => "Scannez / entrez le code QR : ",
            Self::DateNaissance => "Entrez la date de naissance : ",
            Self::NomEquipe => "Entrez le nom de l'équipe : ",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownField(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// FieldRequest
// ---------------------------------------------------------------------------

/// A classified inbound line asking the client for a named value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRequest {
    /// Which field the server wants.
    pub field: FieldName,

    /// Text the server attached to the request, e.g. the `AAAA-MM-JJ` in
    /// `DATE_NAISSANCE:AAAA-MM-JJ`. Shown to the operator as a hint.
    pub cue: Option<String>,

    /// `true` when the server is asking again after a rejected value.
    pub retry: bool,
}

impl FieldRequest {
    /// A first-time request for `field` with no cue.
    pub fn new(field: FieldName) -> Self {
        Self {
            field,
            cue: None,
            retry: false,
        }
    }

    /// A repeated request for `field` after a rejected value.
    pub fn retry(field: FieldName) -> Self {
        Self {
            retry: true,
            ..Self::new(field)
        }
    }

    /// Attaches a server cue. Empty cues are dropped.
    pub fn with_cue(mut self, cue: impl Into<String>) -> Self {
        let cue = cue.into();
        self.cue = if cue.trim().is_empty() {
            None
        } else {
            Some(cue.trim().to_string())
        };
        self
    }

    /// The full prompt shown to the operator.
    pub fn prompt(&self) -> String {
        let label = if self.retry && self.field == FieldName::MotDePasse {
            "reessayer le mot de passe : "
        } else {
            self.field.prompt_label()
        };
        match &self.cue {
            Some(cue) => format!("{} ({cue}) ", label.trim_end()),
            None => label.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// FieldResponse
// ---------------------------------------------------------------------------

/// An outbound `FIELD_NAME:VALUE` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldResponse {
    /// The field being answered.
    pub field: FieldName,
    /// The operator's value, trimmed. May be empty.
    pub value: String,
}

impl FieldResponse {
    /// Builds a response, trimming leading and trailing whitespace from
    /// `raw`.
    pub fn new(field: FieldName, raw: &str) -> Self {
        Self {
            field,
            value: raw.trim().to_string(),
        }
    }

    /// The line exactly as sent, without terminator.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.field, self.value)
    }

    /// The line with secret values masked, for logging.
    pub fn redacted(&self) -> String {
        if self.field.is_secret() {
            format!("{}:***", self.field)
        } else {
            self.encode()
        }
    }
}

impl fmt::Display for FieldResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.value)
    }
}

// ---------------------------------------------------------------------------
// PromptKind
// ---------------------------------------------------------------------------

/// The semantic meaning of an inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    /// The server asks for a field value.
    FieldRequest(FieldRequest),
    /// The server granted access.
    TerminalAuthorized,
    /// The server refused access.
    TerminalDenied,
    /// Any other line. Displayed, never acted on.
    Informational,
    /// The transport returned no line.
    EndOfStream,
}

impl PromptKind {
    /// Returns the requested field, if this is a field request.
    pub fn requested_field(&self) -> Option<FieldName> {
        match self {
            Self::FieldRequest(req) => Some(req.field),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Which handshake variant the client speaks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
pub enum Profile {
    /// ID, then password with one retry, then QR code. The server speaks
    /// free-text prose.
    #[default]
    #[serde(rename = "fixed")]
    Fixed3Step,
    /// The server sends field requests in any order and ends with an
    /// explicit `ACCES AUTORISE` / `ACCES REFUSE` line.
    #[serde(rename = "server-driven")]
    ServerDriven,
}

impl Profile {
    /// The command-line spelling of this profile.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed3Step => "fixed",
            Self::ServerDriven => "server-driven",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" | "fixed3step" | "fixed-3-step" => Ok(Self::Fixed3Step),
            "server-driven" | "serverdriven" | "dynamic" => {
                Ok(Self::ServerDriven)
            }
            _ => Err(ProtocolError::UnknownProfile(s.to_string())),
        }
    }
}
