//! Peer node process
//!
//! Loads (or generates) this node's signing key, serves the peer
//! protocol endpoints, registers with the coordinator, and keeps the
//! local registry snapshot fresh in the background.

use anyhow::Context;
use clap::Parser;
use consensus::crypto::Keystore;
use consensus::{
    peer_router, HttpCoordinatorClient, HttpPeerTransport, NodeAgent, PeerConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "peer", about = "Consensus peer node")]
struct Args {
    /// This node's identity
    #[arg(long)]
    node_id: u64,

    /// Base URL of the coordinator
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    coordinator_url: String,

    /// Socket address to serve on (default: 127.0.0.1:<5000 + node_id>)
    #[arg(long)]
    listen_addr: Option<String>,

    /// Base URL other nodes reach this peer on (default: derived from
    /// the listen address)
    #[arg(long)]
    public_url: Option<String>,

    /// Directory holding this node's key file
    #[arg(long, default_value = "keys")]
    key_dir: PathBuf,

    /// Registry poll interval in seconds
    #[arg(long, default_value_t = 5)]
    refresh_interval_secs: u64,
}

impl Args {
    fn into_config(self) -> PeerConfig {
        let listen_addr = self
            .listen_addr
            .unwrap_or_else(|| format!("127.0.0.1:{}", 5000 + self.node_id));
        PeerConfig {
            node_id: self.node_id,
            coordinator_url: self.coordinator_url,
            listen_addr,
            public_url: self.public_url,
            key_dir: self.key_dir,
            refresh_interval_secs: self.refresh_interval_secs,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();

    let keystore = Keystore::new(&config.key_dir);
    let secret = keystore
        .load_or_generate(config.node_id)
        .context("failed to load signing key")?;

    let agent = Arc::new(NodeAgent::new(
        config.node_id,
        secret,
        Arc::new(HttpPeerTransport::new()),
        Arc::new(HttpCoordinatorClient::new(config.coordinator_url.clone())),
    ));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(node_id = config.node_id, addr = %config.listen_addr, "peer listening");
    let app = peer_router(agent.clone());
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    // The coordinator may still be coming up; retry registration briefly
    let public_url = config.effective_public_url();
    let mut registered = false;
    for attempt in 1..=5 {
        match agent.register_with_coordinator(&public_url).await {
            Ok(_) => {
                registered = true;
                break;
            }
            Err(err) => {
                warn!(attempt, %err, "registration failed, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
    if !registered {
        anyhow::bail!("could not register with coordinator at {}", config.coordinator_url);
    }

    if let Err(err) = agent.refresh_registry().await {
        warn!(%err, "initial registry fetch failed; background refresh will retry");
    }
    agent.spawn_registry_refresh(Duration::from_secs(config.refresh_interval_secs));

    server.await?.context("peer server exited")?;
    Ok(())
}
