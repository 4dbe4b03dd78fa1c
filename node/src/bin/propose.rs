//! Submit a block proposal to a running peer
//!
//! The addressed peer becomes primary for the round; the commit, if
//! reached, shows up on the coordinator's /blockchain endpoint.

use anyhow::Context;
use clap::Parser;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "propose", about = "Submit a block proposal to a peer")]
struct Args {
    /// Base URL of the peer that should act as primary
    #[arg(long, default_value = "http://127.0.0.1:5001")]
    peer_url: String,

    /// Opaque block payload
    block_data: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let response = reqwest::Client::new()
        .post(format!(
            "{}/propose_block",
            args.peer_url.trim_end_matches('/')
        ))
        .json(&json!({ "block_data": args.block_data }))
        .send()
        .await
        .with_context(|| format!("failed to reach peer at {}", args.peer_url))?;

    let status = response.status();
    let body: serde_json::Value = response.json().await.context("unreadable response")?;
    println!("{body}");
    if !status.is_success() {
        anyhow::bail!("proposal rejected ({status})");
    }
    Ok(())
}
