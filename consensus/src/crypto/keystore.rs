/// On-disk keystore for node signing keys
///
/// A node's secret key is generated on first run and persisted so the
/// same key pair identifies the node_id across restarts.

use super::ecdsa::{CryptoError, SecretKey};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum KeystoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored key is invalid: {0}")]
    InvalidKey(#[from] CryptoError),
}

/// Directory-backed store holding one key file per node_id
pub struct Keystore {
    dir: PathBuf,
}

impl Keystore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_path(&self, node_id: u64) -> PathBuf {
        self.dir.join(format!("node_{node_id}.key"))
    }

    /// Load the key for `node_id`, generating and persisting a new one
    /// if no key file exists yet.
    pub fn load_or_generate(&self, node_id: u64) -> Result<SecretKey, KeystoreError> {
        let path = self.key_path(node_id);
        if path.exists() {
            let key = Self::read_key(&path)?;
            info!(node_id, path = %path.display(), "loaded existing key pair");
            Ok(key)
        } else {
            fs::create_dir_all(&self.dir)?;
            let key = SecretKey::generate();
            fs::write(&path, key.to_hex())?;
            info!(node_id, path = %path.display(), "generated new key pair");
            Ok(key)
        }
    }

    fn read_key(path: &Path) -> Result<SecretKey, KeystoreError> {
        let contents = fs::read_to_string(path)?;
        Ok(SecretKey::from_hex(&contents)?)
    }
}
