/// Process configuration
///
/// Plain serde structs with defaults; the binaries expose every field as
/// a CLI flag.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a peer node process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub node_id: u64,
    /// Base URL of the coordinator
    pub coordinator_url: String,
    /// Socket address the peer's HTTP endpoints bind to
    pub listen_addr: String,
    /// Base URL other nodes should reach this peer on; derived from
    /// `listen_addr` when unset
    pub public_url: Option<String>,
    /// Directory holding this node's key file
    pub key_dir: PathBuf,
    /// Registry poll interval in seconds
    pub refresh_interval_secs: u64,
}

impl PeerConfig {
    pub fn effective_public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.listen_addr))
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            node_id: 1,
            coordinator_url: "http://127.0.0.1:5000".to_string(),
            listen_addr: "127.0.0.1:5001".to_string(),
            public_url: None,
            key_dir: PathBuf::from("keys"),
            refresh_interval_secs: 5,
        }
    }
}

/// Configuration for the coordinator process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Socket address the coordinator's HTTP endpoints bind to
    pub listen_addr: String,
    /// Ledger file path
    pub ledger_path: PathBuf,
    /// Retained protocol event count
    pub event_history: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5000".to_string(),
            ledger_path: PathBuf::from("blockchain.json"),
            event_history: 1024,
        }
    }
}
