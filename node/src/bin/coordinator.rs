//! Central consensus coordinator process
//!
//! Serves node registration, the public key registry, commit-vote
//! tallying, and the committed block ledger over HTTP.

use anyhow::Context;
use clap::Parser;
use consensus::{coordinator_router, Coordinator, CoordinatorConfig, Ledger};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "coordinator", about = "Central consensus coordinator")]
struct Args {
    /// Socket address to serve on
    #[arg(long, default_value = "127.0.0.1:5000")]
    listen_addr: String,

    /// Ledger file path
    #[arg(long, default_value = "blockchain.json")]
    ledger_path: PathBuf,

    /// Number of protocol events retained for /logs
    #[arg(long, default_value_t = 1024)]
    event_history: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = CoordinatorConfig {
        listen_addr: args.listen_addr,
        ledger_path: args.ledger_path,
        event_history: args.event_history,
    };

    let coordinator = Arc::new(Coordinator::with_event_capacity(
        Ledger::new(&config.ledger_path),
        config.event_history,
    ));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(
        addr = %config.listen_addr,
        ledger = %config.ledger_path.display(),
        "coordinator listening"
    );
    axum::serve(listener, coordinator_router(coordinator)).await?;
    Ok(())
}
