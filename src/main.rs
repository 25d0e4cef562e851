//! vitals: service backbone for an AI query pipeline.
//!
//! Entry point: initializes tracing, loads configuration from the
//! environment, connects the PostgreSQL store, applies migrations, and
//! serves the HTTP API until interrupted.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vitals::config::Config;
use vitals::history::Store;
use vitals::http::{self, AppState};
use vitals::server::ApiServer;

/// Service backbone for an AI query pipeline.
#[derive(Parser, Debug)]
#[command(name = "vitals", version, about)]
struct Args {
    /// Override the configured HTTP port.
    #[arg(long)]
    port: Option<u16>,

    /// Log level filter (e.g. "vitals=debug,tower_http=info").
    #[arg(short, long)]
    log_level: Option<String>,

    /// Apply pending database migrations and exit.
    #[arg(long)]
    migrate_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Priority: CLI > env > default.
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "vitals=info,tower_http=warn".to_string());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env()?;
    if let Some(port) = args.port {
        config.http.port = port;
    }

    let store = Store::new(&config.database).await?;
    store.run_migrations().await?;
    tracing::info!("Connected to database, migrations applied");

    if args.migrate_only {
        return Ok(());
    }

    let state = AppState::new(Arc::new(store), config.health.clone());
    let mut server = ApiServer::new(config.http.addr()?);
    server.start(http::router(state)).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received");
    server.shutdown().await;

    Ok(())
}
