//! gasmon-service - ingestion and history HTTP API.
//!
//! Run with: `cargo run -p gasmon-service`

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use gasmon_service::{AppState, Config, build_router};
use gasmon_store::Store;

/// gasmon-service - gas sensor ingestion and history API.
#[derive(Parser, Debug)]
#[command(name = "gasmon-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Gas threshold in ppm (overrides config).
    #[arg(long)]
    threshold: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gasmon_service=info".parse()?)
                .add_directive("gasmon_store=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_else(|e| {
            warn!("Ignoring unreadable default config: {}", e);
            Config::default()
        }),
    };

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db_path) = args.database {
        config.storage.path = db_path;
    }
    if let Some(threshold) = args.threshold {
        config.classifier.gas_threshold = threshold;
    }
    config.validate()?;

    let store = Store::open(&config.storage.path)?;
    let addr: SocketAddr = config.server.bind.parse()?;
    info!(
        threshold = config.classifier.gas_threshold,
        "Classifying gas channels"
    );

    let state = AppState::new(store, config);
    let app = build_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
