/// Coordinated block consensus for a fixed set of peer nodes
///
/// Implements a simplified three-phase commit (proposal → prepare →
/// commit) with:
/// - ECDSA P-256 signatures authenticating every protocol message
/// - A per-node agent driving the propose/validate/vote state machine
/// - A central coordinator that registers nodes, tallies commit votes,
///   and commits only on a vote from every registered node (unanimity)
/// - A durable append-only ledger of committed blocks

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod crypto;
pub mod events;
pub mod ledger;
pub mod messages;
pub mod network;
pub mod registry;

#[cfg(test)]
mod integration_tests;

pub use agent::{AgentError, AgentState, NodeAgent};
pub use config::{CoordinatorConfig, PeerConfig};
pub use coordinator::{CommitOutcome, Coordinator, CoordinatorError};
pub use crypto::{verify_hex, Keystore, PublicKey, SecretKey, Signature};
pub use events::{EventLog, ProtocolEvent};
pub use ledger::{Block, Ledger, LedgerError};
pub use messages::{CommitVote, PrepareVote, Proposal, RegisterRequest};
pub use network::{
    coordinator_router, peer_router, CoordinatorClient, HttpCoordinatorClient, HttpPeerTransport,
    PeerTransport, TransportError,
};
pub use registry::{Identity, Registry, RegistryView};
