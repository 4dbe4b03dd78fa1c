/// Message transport layer
///
/// The protocol core never performs I/O directly: the agent sends through
/// `PeerTransport` and talks to the coordinator through `CoordinatorClient`.
/// HTTP implementations live in `http`; `local` provides an in-process
/// transport used by the integration tests.
///
/// Transport failures are caught and logged at the call site. A send
/// failure to one peer never blocks fan-out to the remaining peers and
/// never corrupts protocol state.

use crate::messages::{CommitVote, PrepareVote, Proposal, RegisterRequest};
use crate::registry::{Identity, RegistryView};
use async_trait::async_trait;

pub mod http;
pub mod local;

pub use http::{coordinator_router, peer_router, HttpCoordinatorClient, HttpPeerTransport};
pub use local::{InProcessCoordinator, LoopbackNetwork};

/// Transport error types
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Peer unreachable: {0}")]
    Unreachable(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Node-to-node message delivery
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Deliver a proposal to the peer served at `address`
    async fn send_proposal(&self, address: &str, proposal: &Proposal) -> TransportResult<()>;

    /// Deliver a prepare vote to the primary served at `address`
    async fn send_prepare(&self, address: &str, vote: &PrepareVote) -> TransportResult<()>;
}

/// Node-to-coordinator requests
#[async_trait]
pub trait CoordinatorClient: Send + Sync {
    /// Register this node's identity; returns the confirmed identity
    async fn register(&self, request: &RegisterRequest) -> TransportResult<Identity>;

    /// Fetch the coordinator's current registry
    async fn fetch_registry(&self) -> TransportResult<RegistryView>;

    /// Record the round's proposal with the coordinator
    async fn submit_proposal(&self, proposal: &Proposal) -> TransportResult<()>;

    /// Submit this node's commit vote
    async fn submit_commit_vote(&self, vote: &CommitVote) -> TransportResult<()>;
}
