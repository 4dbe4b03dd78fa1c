/// Node identity registry
///
/// The coordinator owns the authoritative `Registry`; peers hold immutable
/// `RegistryView` snapshots that they refresh periodically. A node_id maps
/// to exactly one identity at a time, and that identity's public key is the
/// only key ever used to verify the node's signed messages.

use crate::messages::RegisterRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A registered node: id, verification key, and reachable address
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub node_id: u64,
    /// Hex-encoded SEC1 public key
    pub public_key: String,
    /// Base URL the node's peer endpoints are served on
    pub address: String,
}

impl From<RegisterRequest> for Identity {
    fn from(req: RegisterRequest) -> Self {
        Self {
            node_id: req.node_id,
            public_key: req.public_key,
            address: req.address,
        }
    }
}

/// Coordinator-side authoritative registry
#[derive(Debug, Default)]
pub struct Registry {
    nodes: BTreeMap<u64, Identity>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent upsert. Re-registering a node_id replaces its identity.
    pub fn register(&mut self, identity: Identity) -> Identity {
        self.nodes.insert(identity.node_id, identity.clone());
        identity
    }

    pub fn get(&self, node_id: u64) -> Option<&Identity> {
        self.nodes.get(&node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Immutable snapshot for readers
    pub fn snapshot(&self) -> RegistryView {
        RegistryView {
            nodes: self.nodes.clone(),
        }
    }
}

/// Immutable registry snapshot held by peers and refreshed on an interval
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryView {
    nodes: BTreeMap<u64, Identity>,
}

impl RegistryView {
    /// The current key for a node_id. `None` for unknown nodes, which
    /// callers must treat as verification failure.
    pub fn public_key_of(&self, node_id: u64) -> Option<&str> {
        self.nodes.get(&node_id).map(|id| id.public_key.as_str())
    }

    pub fn address_of(&self, node_id: u64) -> Option<&str> {
        self.nodes.get(&node_id).map(|id| id.address.as_str())
    }

    /// All registered identities except `node_id`, in id order
    pub fn peers_excluding(&self, node_id: u64) -> impl Iterator<Item = &Identity> {
        self.nodes.values().filter(move |id| id.node_id != node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
