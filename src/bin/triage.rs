use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use inbox_triage::{ConfigError, IntentError, Message, TriageConfig, TriagePipeline, TriageRequest};

#[derive(Parser, Debug)]
#[command(
    name = "triage",
    about = "Thread, merge and rank a batch of messages for an inbox view"
)]
struct Args {
    /// JSON file holding an array of messages.
    #[arg(long)]
    messages: PathBuf,

    /// Optional JSON file with merge overrides, pins and ignored participants.
    #[arg(long)]
    request: Option<PathBuf>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read messages from {path}: {source}")]
    Messages {
        path: String,
        source: io::Error,
    },
    #[error("invalid message JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Intent(#[from] IntentError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    if let Err(err) = run(Args::parse()).await {
        log::error!("triage failed: {}", err);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(&args.messages).map_err(|source| CliError::Messages {
        path: args.messages.display().to_string(),
        source,
    })?;
    let messages: Vec<Message> = serde_json::from_str(&raw)?;

    let request = match &args.request {
        Some(path) => TriageRequest::from_json_file(path)?,
        None => TriageRequest::default(),
    };

    let pipeline = TriagePipeline::new(TriageConfig::from_env());
    let outcome = pipeline.run(messages, &request).await?;

    for group in &outcome.groups {
        log::debug!(
            "{} [{:?}] score {:.2}, last active {}",
            group.summary(),
            group.badges(),
            group.priority_score(),
            group.last_updated()
        );
    }

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string(&outcome)?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}
