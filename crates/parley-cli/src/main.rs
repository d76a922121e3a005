use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use parley_cli::app::{self, StartAt};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "parley - resumable terminal chat with Claude")]
#[command(version)]
struct Cli {
    /// LLM model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum tokens per reply
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Sessions file (defaults to ~/.parley/sessions.json)
    #[arg(long)]
    sessions_file: Option<PathBuf>,

    /// Resume the session with this id
    #[arg(short, long, conflicts_with = "continue_latest")]
    session: Option<String>,

    /// Resume the most recent session
    #[arg(short = 'c', long = "continue")]
    continue_latest: bool,

    /// List saved sessions and exit
    #[arg(long)]
    list: bool,

    /// Color theme (dark, tokyo-night, plain)
    #[arg(long, default_value = "dark")]
    theme: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = parley_core::Settings::load();

    if let Some(model) = cli.model {
        settings.llm.model = model;
    }
    if let Some(max_tokens) = cli.max_tokens {
        settings.llm.max_tokens = max_tokens;
    }
    if let Some(path) = cli.sessions_file {
        settings.chat.sessions_file = Some(path);
    }

    if cli.list {
        return app::list_sessions(&settings);
    }

    let start = match (cli.session, cli.continue_latest) {
        (Some(id), _) => StartAt::Session(id),
        (None, true) => StartAt::Latest,
        (None, false) => StartAt::New,
    };

    app::run_chat(settings, start, &cli.theme).await
}
