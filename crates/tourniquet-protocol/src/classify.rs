//! Prompt classifiers: map a raw inbound line to a [`PromptKind`].
//!
//! Each profile has its own classifier. Classification does no I/O: the
//! same line always yields the same kind for the same classifier.
//!
//! - [`ServerDrivenClassifier`] matches literal control lines.
//! - [`FixedClassifier`] searches lower-cased, accent-folded prose for the
//!   phrase its [`FixedStep`] expects. Anything it does not recognize is
//!   informational.

use crate::{FieldName, FieldRequest, PromptKind};

/// Maps an inbound line to its meaning for one profile.
///
/// `None` is the transport's end-of-stream signal and always classifies as
/// [`PromptKind::EndOfStream`].
pub trait Classifier {
    /// Classifies one line.
    fn classify(&self, line: Option<&str>) -> PromptKind;
}

// ---------------------------------------------------------------------------
// ServerDrivenClassifier
// ---------------------------------------------------------------------------

/// Classifier for the server-driven profile.
///
/// Matching is literal and case-sensitive:
///
/// | Line                  | Kind                              |
/// |-----------------------|-----------------------------------|
/// | `ACCES AUTORISE...`   | `TerminalAuthorized`              |
/// | `ACCES REFUSE...`     | `TerminalDenied`                  |
/// | `DATE_NAISSANCE:...`  | request, the rest is the cue      |
/// | `NOM_EQUIPE:?`        | request                           |
/// | `QR_CODE:?`           | request                           |
/// | `MOT_DE_PASSE:?`      | request                           |
/// | anything else         | `Informational`                   |
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerDrivenClassifier;

const AUTHORIZED_PREFIX: &str = "ACCES AUTORISE";
const DENIED_PREFIX: &str = "ACCES REFUSE";

/// Fields the server-driven profile requests with an exact `NAME:?` line.
const EXACT_REQUESTS: [FieldName; 3] = [
    FieldName::NomEquipe,
    FieldName::QrCode,
    FieldName::MotDePasse,
];

impl Classifier for ServerDrivenClassifier {
    fn classify(&self, line: Option<&str>) -> PromptKind {
        let Some(line) = line else {
            return PromptKind::EndOfStream;
        };

        if line.starts_with(AUTHORIZED_PREFIX) {
            return PromptKind::TerminalAuthorized;
        }
        if line.starts_with(DENIED_PREFIX) {
            return PromptKind::TerminalDenied;
        }

        if let Some(cue) = line
            .strip_prefix(FieldName::DateNaissance.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
        {
            return PromptKind::FieldRequest(
                FieldRequest::new(FieldName::DateNaissance).with_cue(cue),
            );
        }

        EXACT_REQUESTS
            .into_iter()
            .find(|field| {
                line.strip_prefix(field.as_str()) == Some(":?")
            })
            .map(|field| PromptKind::FieldRequest(FieldRequest::new(field)))
            .unwrap_or(PromptKind::Informational)
    }
}

// ---------------------------------------------------------------------------
// FixedClassifier
// ---------------------------------------------------------------------------

/// Where the fixed 3-step exchange stands when a line arrives.
///
/// Each step listens only for its own phrase, so a line that mentions
/// both the password and the QR code means whatever the current step is
/// waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixedStep {
    /// ID sent; waiting for the password prompt.
    #[default]
    PasswordPrompt,
    /// First password sent; waiting for the QR prompt or a retry notice.
    AfterPassword,
    /// Retry password sent; waiting for the QR prompt.
    AfterRetry,
    /// QR code sent; waiting for the access decision.
    QrResult,
}

/// Classifier for the fixed 3-step profile.
///
/// The server speaks prose, so this searches the normalized line for the
/// phrase the current [`FixedStep`] expects:
///
/// | Step             | Phrase                          | Kind                 |
/// |------------------|---------------------------------|----------------------|
/// | `PasswordPrompt` | "mot de passe"                  | password request     |
/// | `AfterPassword`  | "qr", else "tentative 1/2"      | QR or retry request  |
/// | `AfterRetry`     | "qr"                            | QR request           |
/// | `QrResult`       | none                            |                      |
///
/// A line without the expected phrase is checked for a decision:
/// "acces autorise" is `TerminalAuthorized`, a refusal word ("refuse",
/// "bloque") not negated by the word before it is `TerminalDenied`, and
/// anything else is `Informational`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClassifier {
    step: FixedStep,
}

impl FixedClassifier {
    /// A classifier for lines read at `step`.
    pub fn at(step: FixedStep) -> Self {
        Self { step }
    }
}

impl Classifier for FixedClassifier {
    fn classify(&self, line: Option<&str>) -> PromptKind {
        let Some(line) = line else {
            return PromptKind::EndOfStream;
        };
        let text = normalize(line);

        let request = match self.step {
            FixedStep::PasswordPrompt => text
                .contains("mot de passe")
                .then(|| FieldRequest::new(FieldName::MotDePasse)),
            FixedStep::AfterPassword => {
                if text.contains("qr") {
                    Some(FieldRequest::new(FieldName::QrCode))
                } else if text.contains("tentative 1/2") {
                    Some(FieldRequest::retry(FieldName::MotDePasse))
                } else {
                    None
                }
            }
            FixedStep::AfterRetry => text
                .contains("qr")
                .then(|| FieldRequest::new(FieldName::QrCode)),
            FixedStep::QrResult => None,
        };

        match request {
            Some(request) => PromptKind::FieldRequest(request),
            None => decision(&text),
        }
    }
}

const REFUSAL_WORDS: [&str; 4] = ["refuse", "refusee", "bloque", "bloquee"];
const NEGATIONS: [&str; 2] = ["non", "pas"];

/// Reads a normalized line as an access decision.
fn decision(text: &str) -> PromptKind {
    if text.contains("acces autorise") {
        PromptKind::TerminalAuthorized
    } else if is_refusal(text) {
        PromptKind::TerminalDenied
    } else {
        PromptKind::Informational
    }
}

/// Whole-word match, so "debloque" and "non refuse" are not refusals.
fn is_refusal(text: &str) -> bool {
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    words.iter().enumerate().any(|(i, word)| {
        REFUSAL_WORDS.contains(word)
            && !i
                .checked_sub(1)
                .is_some_and(|prev| NEGATIONS.contains(&words[prev]))
    })
}

/// Lower-cases `line` and folds French accented letters to ASCII, so that
/// "Accès autorisé" and "ACCES AUTORISE" compare equal.
pub fn normalize(line: &str) -> String {
    line.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
