//! Chatwire - terminal chat with the agent backend.
//!
//! This is the entry point for the `chatwire` binary.

mod app;
mod render;

use std::io::Write;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use app::{parse_command, App, Flow};
use chatwire_client::{BackendClient, ChatSession, ClientConfig, DEFAULT_AGENT, DEFAULT_MODEL};

/// Chatwire - terminal chat with the agent backend.
#[derive(Parser, Debug)]
#[command(name = "chatwire")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend URL.
    #[arg(long, env = "CHATWIRE_BACKEND", default_value = "http://localhost:5000")]
    backend: String,

    /// Agent to talk to.
    #[arg(long, env = "CHATWIRE_AGENT", default_value = DEFAULT_AGENT)]
    agent: String,

    /// Model to use until the backend's list says otherwise.
    #[arg(long, env = "CHATWIRE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Timeout for non-streaming requests, in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they never mix with streamed replies.
    let filter = if args.debug {
        EnvFilter::new("chatwire=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig {
        base_url: args.backend,
        default_agent: args.agent,
        default_model: args.model,
        request_timeout_seconds: args.timeout,
        ..ClientConfig::default()
    };
    tracing::info!(backend = %config.base_url, "Starting chatwire");

    let client = BackendClient::new(config)?;
    let mut session = ChatSession::with_backend(client);
    // Normalizes case and rejects agents the backend does not offer.
    let agent = session.agent();
    session.select_agent(&agent)?;

    let mut app = App::new(session);
    app.load_models().await;
    println!("Type /help for commands.");

    run_repl(&mut app).await
}

/// Read lines until `/quit`, EOF or Ctrl-C at the prompt.
async fn run_repl(app: &mut App) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", app.prompt());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let Some(command) = parse_command(&line) else {
            continue;
        };

        match app.handle(command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("error: {e:#}"),
        }
    }

    Ok(())
}
