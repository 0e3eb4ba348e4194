use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tourniquet::prelude::*;
use tourniquet_protocol::ProtocolError;
use tracing_subscriber::EnvFilter;

/// Access handshake client
#[derive(Parser, Debug)]
#[command(name = "tourniquet", version)]
#[command(about = "Authenticate a player against an access server", long_about = None)]
struct Args {
    /// Server host name or address
    #[arg(long, default_value = tourniquet::DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = tourniquet::DEFAULT_PORT)]
    port: u16,

    /// Handshake profile: "fixed" or "server-driven"
    #[arg(long, default_value = "fixed", value_parser = parse_profile)]
    profile: Profile,

    /// Send this player ID instead of prompting for it
    #[arg(long)]
    player_id: Option<String>,

    /// Give up if the server is silent for this many seconds
    #[arg(long)]
    read_timeout_secs: Option<u64>,

    /// Print the session report as JSON on stdout (console text goes to stderr)
    #[arg(long)]
    json: bool,
}

fn parse_profile(s: &str) -> Result<Profile, ProtocolError> {
    s.parse()
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(outcome) => exit_code(outcome),
        Err(e) => {
            eprintln!("{}", failure_message(&e));
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<Outcome, TourniquetError> {
    let console = || -> Box<dyn Write + Send> {
        if args.json {
            Box::new(std::io::stderr())
        } else {
            Box::new(std::io::stdout())
        }
    };

    let mut builder = ClientBuilder::new()
        .host(&args.host)
        .port(args.port)
        .profile(args.profile);
    if let Some(id) = &args.player_id {
        builder = builder.player_id(id);
    }
    if let Some(secs) = args.read_timeout_secs {
        builder = builder.read_timeout(Duration::from_secs(secs));
    }

    let client = builder.connect().await?;

    let mut reporter = ConsoleReporter::new(console());
    reporter.connected(client.addr());
    let collector = ConsoleCollector::stdin(console());

    let report = client.run(collector, reporter).await?;

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!(error = %e, "could not serialize report"),
        }
    }
    Ok(report.outcome)
}

/// Operator-facing text for an error that stopped the client.
fn failure_message(err: &TourniquetError) -> String {
    match err {
        TourniquetError::Transport(e) => {
            format!(" Erreur de connexion au serveur : {e}")
        }
        TourniquetError::Session(e) => format!(" Saisie interrompue : {e}"),
        TourniquetError::Protocol(e) => format!(" Configuration invalide : {e}"),
    }
}

/// 0 when access was granted, a distinct non-zero code otherwise.
fn exit_code(outcome: Outcome) -> ExitCode {
    match outcome {
        Outcome::Authorized => ExitCode::SUCCESS,
        Outcome::ConnectionLost => ExitCode::from(1),
        Outcome::Denied { .. } => ExitCode::from(2),
        Outcome::Indeterminate | Outcome::Pending => ExitCode::from(3),
    }
}
