//! pcat-ingest - stream a playlist categorization to the terminal
//!
//! Starts one ingestion session against the categorization backend, fetches
//! the playlist's total track count alongside it, and prints the active
//! category tab as snapshots arrive. Ctrl+C cancels the session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use pcat_common::config::{resolve_access_token, ConfigResolver};
use pcat_ingest::bridge::TerminalBridge;
use pcat_ingest::models::{Category, SessionState, SessionUpdate};
use pcat_ingest::source::{HttpCategorizer, StaticCredential};
use pcat_ingest::{IngestionSession, SessionConfig, StartOutcome, Target};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for pcat-ingest
#[derive(Parser, Debug)]
#[command(name = "pcat-ingest")]
#[command(about = "Stream playlist categorization results")]
#[command(version)]
struct Args {
    /// Playlist to categorize
    #[arg(short, long)]
    playlist: String,

    /// JSON file with `[{"category_name": ..., "description": ...}]`
    #[arg(short, long)]
    categories: PathBuf,

    /// Category count sent to the backend (defaults to the number in the file)
    #[arg(short, long)]
    num_categories: Option<usize>,

    /// Backend base URL (overrides config)
    #[arg(long, env = "PCAT_SERVER_URL")]
    server: Option<String>,

    /// Access token (overrides PCAT_ACCESS_TOKEN and config)
    #[arg(long)]
    token: Option<String>,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Category tab to display
    #[arg(long)]
    tab: Option<String>,

    /// Fail when no data arrives for this many seconds
    #[arg(long)]
    inactivity_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigResolver::new("pcat")
        .load(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing: RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("pcat_ingest={0},pcat_common={0}", config.logging.level))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting pcat-ingest {}", env!("CARGO_PKG_VERSION"));

    let categories = load_categories(&args.categories)?;
    let server_url = args.server.clone().unwrap_or_else(|| config.server_url.clone());
    let token = resolve_access_token(args.token.as_deref(), &config);

    let mut session_config = SessionConfig::from(&config.ingest);
    if let Some(secs) = args.inactivity_timeout_secs {
        session_config.inactivity_timeout = Some(std::time::Duration::from_secs(secs));
    }

    let backend = Arc::new(
        HttpCategorizer::new(&server_url, config.ingest.connect_timeout())
            .context("Failed to build HTTP client")?,
    );
    info!("Backend: {}", backend.base_url());

    let session = IngestionSession::new(session_config, Arc::new(StaticCredential::new(token)));
    let mut subscription = session.subscribe();

    let mut bridge = TerminalBridge::new();
    if let Some(tab) = &args.tab {
        bridge.select_tab(tab);
    }

    let target = Target {
        playlist_id: args.playlist.clone(),
        num_categories: args.num_categories,
    };
    if let StartOutcome::Rejected(e) = session.start(target, categories, backend.clone()) {
        print!("{}", TerminalBridge::render_error(&e));
        bail!("Session could not start: {}", e);
    }
    session.track_total(backend, args.playlist.clone());

    let cancel_session = session.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling");
            cancel_session.cancel();
        }
    });

    while let Some(update) = subscription.next().await {
        match update {
            SessionUpdate::Snapshot(snapshot) => {
                println!("{}", bridge.render(&snapshot));
            }
            SessionUpdate::Failed(e) => {
                print!("{}", TerminalBridge::render_error(&e));
            }
        }
    }

    match session.wait().await {
        SessionState::Completed => {
            info!("Categorization complete");
            Ok(())
        }
        SessionState::Cancelled => {
            warn!("Categorization cancelled");
            Ok(())
        }
        state => bail!("Categorization ended in state {:?}", state),
    }
}

fn load_categories(path: &std::path::Path) -> Result<Vec<Category>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read categories from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid categories file {}", path.display()))
}
