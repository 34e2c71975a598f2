//! chatrelay - relay chat messages to a conversational web backend

mod config;
mod console;
mod handler;

use anyhow::Context as _;
use chatrelay_core::{CredentialStore, Dialogue, HttpTransport, SessionManager, Transport};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::console::ConsoleSource;
use crate::handler::MessageHandler;

/// chatrelay - chat bot bridge to a conversational backend
#[derive(Parser, Debug)]
#[command(name = "chatrelay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File holding the session cookie value (default: ./sessionToken)
    #[arg(short, long)]
    session_token_file: Option<String>,

    /// Name the bot is mentioned by in groups
    #[arg(short, long)]
    bot_name: Option<String>,

    /// Treat console input as messages posted in this group
    #[arg(short, long)]
    group: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "chatrelay=debug,chatrelay_core=debug"
    } else {
        "chatrelay=info,chatrelay_core=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    // Initialize config and exit
    if args.init_config {
        let path = config::Config::init().context("failed to create config file")?;
        println!("Config file created at: {}", path.display());
        println!("\nExample config:\n{}", config::example_config());
        return Ok(());
    }

    // Merge config with CLI args (CLI takes precedence)
    let mut cfg = config::Config::load();
    if args.session_token_file.is_some() {
        cfg.session_token_file = args.session_token_file;
    }
    if args.bot_name.is_some() {
        cfg.bot_name = args.bot_name;
    }
    if args.group.is_some() {
        cfg.group = args.group;
    }
    let settings = cfg.provider_settings();

    // No credential, no service
    let credentials = CredentialStore::load(cfg.session_token_path())?;
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(settings.clone())?);
    let session = SessionManager::initialize(credentials, Arc::clone(&transport)).await?;

    let cancel = CancellationToken::new();
    let refresh = session.spawn_refresh_task(settings.refresh_interval, cancel.clone());

    let dialogue = Arc::new(Dialogue::new(session, transport, &settings));
    let handler = MessageHandler::new(dialogue, cfg.bot_name.clone(), cfg.reply_prefix());
    let sender_name = std::env::var("USER").unwrap_or_else(|_| "console".to_string());
    let source = ConsoleSource::new(sender_name, cfg.group.clone(), handler.mention_tag());

    tracing::info!("chatrelay ready, reading messages from stdin");

    let result = tokio::select! {
        result = console::run(&handler, &source) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(())
        }
    };

    cancel.cancel();
    if let Err(e) = refresh.await {
        tracing::warn!("Session refresh task ended abnormally: {}", e);
    }

    result
}
