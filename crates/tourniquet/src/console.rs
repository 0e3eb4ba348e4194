//! Console collaborators: operator input from a line reader, progress to a
//! text writer.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tourniquet_protocol::FieldRequest;
use tourniquet_session::{Collector, Outcome, Reporter, SessionError, SessionEvent};

const SEPARATOR: &str = "------------------------------------";

/// Asks the operator for each value: prints the prompt, reads one line.
pub struct ConsoleCollector<R, W> {
    input: tokio::io::Lines<R>,
    prompt: W,
}

impl ConsoleCollector<BufReader<Stdin>, Box<dyn Write + Send>> {
    /// Reads stdin, prompting on `prompt` (stdout or stderr).
    pub fn stdin(prompt: Box<dyn Write + Send>) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), prompt)
    }
}

impl<R, W> ConsoleCollector<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    /// Reads operator lines from `input`, writing prompts to `prompt`.
    pub fn new(input: R, prompt: W) -> Self {
        Self {
            input: input.lines(),
            prompt,
        }
    }
}

impl<R, W> Collector for ConsoleCollector<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    async fn collect(
        &mut self,
        request: &FieldRequest,
    ) -> Result<String, SessionError> {
        let field = request.field;
        write!(self.prompt, "{}", request.prompt())
            .and_then(|()| self.prompt.flush())
            .map_err(|e| SessionError::Collector {
                field,
                reason: e.to_string(),
            })?;

        match self.input.next_line().await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => Err(SessionError::InputClosed(field)),
            Err(e) => Err(SessionError::Collector {
                field,
                reason: e.to_string(),
            }),
        }
    }
}

/// Prints session progress as operator-facing text.
pub struct ConsoleReporter<W> {
    out: W,
}

impl<W: Write + Send> ConsoleReporter<W> {
    /// Writes to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Announces an established connection.
    pub fn connected(&mut self, addr: &str) {
        self.line(&format!(" Connexion au serveur établie ({addr})."));
        self.line(SEPARATOR);
    }

    /// Gives back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            tracing::debug!(error = %e, "console write failed");
        }
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn report(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ServerLine(line) => {
                self.line(&format!("SERVEUR : {line}"));
            }
            SessionEvent::RetryExhausted => {
                self.line("tentative 2 echouée , compte bloqué");
            }
            SessionEvent::ConnectionLost(reason) => {
                self.line(&format!(" Connexion perdue : {reason}"));
            }
            SessionEvent::Finished(outcome) => {
                self.line(SEPARATOR);
                self.line(&format!("Résultat : {}", outcome_label(outcome)));
                self.line("Session terminée.");
            }
        }
    }
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Authorized => "accès autorisé",
        Outcome::Denied { .. } => "accès refusé",
        Outcome::ConnectionLost => "connexion perdue",
        Outcome::Indeterminate => "aucune décision",
        Outcome::Pending => "en cours",
    }
}
