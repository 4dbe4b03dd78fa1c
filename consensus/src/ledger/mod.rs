/// Durable append-only ledger of committed blocks
///
/// The ledger is a JSON array on disk: loaded fully on read and rewritten
/// fully on each append. Insertion order is commit order and is never
/// reordered after append. Full-rewrite persistence is acceptable at this
/// ledger's size; callers append under the coordinator's commit
/// serialization point, so appends never race each other.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// A committed block. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub block_data: String,
    /// node_id of the round's proposer
    pub committed_by: u64,
    /// RFC 3339 commit timestamp
    pub commit_time: String,
}

/// JSON-file-backed block store
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full committed sequence. A missing or unreadable file
    /// reads as an empty ledger rather than an error.
    pub fn load(&self) -> Result<Vec<Block>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&contents) {
            Ok(blocks) => Ok(blocks),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "ledger file unreadable, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Append a block and persist the whole sequence
    pub fn append(&self, block: Block) -> Result<()> {
        let mut blocks = self.load()?;
        blocks.push(block);
        let contents = serde_json::to_string_pretty(&blocks)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, contents)?;
        Ok(())
    }
}
