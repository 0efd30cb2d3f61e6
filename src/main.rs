mod client;
mod config;
mod conversation;
mod decode;
mod events;
mod ui;

use std::io::Write;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::client::{ChatClient, ChatRequest, StreamEvent};
use crate::config::Config;

#[derive(Parser)]
#[command(name = "threadline")]
#[command(version)]
#[command(about = "Terminal client for streaming chat threads", long_about = None)]
struct Cli {
    /// Base URL of the chat server (overrides config and THREADLINE_SERVER)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single message and print the streamed reply
    Ask {
        /// The message to send
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    init_logging(&config)?;

    match cli.command {
        None => ui::app::run(config).await,
        Some(Commands::Ask { text }) => ask(config, text.join(" ")).await,
    }
}

/// One-shot mode: a single exchange streamed straight to stdout.
async fn ask(config: Config, text: String) -> Result<()> {
    let content = text.trim();
    if content.is_empty() {
        anyhow::bail!("nothing to send");
    }

    let client = ChatClient::new(&config);
    let mut rx = client
        .stream(ChatRequest {
            content: content.to_string(),
            thread_id: None,
        })
        .await?;

    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Delta(chunk) => {
                stdout.write_all(chunk.as_bytes())?;
                stdout.flush()?;
            }
            StreamEvent::Done { .. } => break,
            StreamEvent::Error(_) => {
                println!();
                anyhow::bail!("{}", conversation::FAILURE_NOTICE);
            }
        }
    }
    println!();

    Ok(())
}

/// Logs go to a file under the threadline home so they never interleave
/// with the TUI.
fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path();
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("threadline=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
