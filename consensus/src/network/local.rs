/// In-process transport
///
/// Delivers messages by calling the receiving agent or coordinator
/// directly, with the same observable semantics as the HTTP transport:
/// unknown addresses are unreachable, and a message the receiver drops
/// still counts as delivered. Used by the integration tests to run a
/// whole cluster inside one process.

use super::{CoordinatorClient, PeerTransport, TransportError, TransportResult};
use crate::agent::NodeAgent;
use crate::coordinator::Coordinator;
use crate::messages::{CommitVote, PrepareVote, Proposal, RegisterRequest};
use crate::registry::{Identity, RegistryView};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Address-keyed fabric of in-process peers
#[derive(Default)]
pub struct LoopbackNetwork {
    peers: Mutex<HashMap<String, Arc<NodeAgent>>>,
}

impl LoopbackNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `agent` reachable at `address`
    pub fn attach(&self, address: impl Into<String>, agent: Arc<NodeAgent>) {
        self.peers.lock().unwrap().insert(address.into(), agent);
    }

    fn lookup(&self, address: &str) -> TransportResult<Arc<NodeAgent>> {
        self.peers
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| TransportError::Unreachable(address.to_string()))
    }
}

#[async_trait]
impl PeerTransport for LoopbackNetwork {
    async fn send_proposal(&self, address: &str, proposal: &Proposal) -> TransportResult<()> {
        let agent = self.lookup(address)?;
        // The receiver logs and drops invalid proposals; delivery itself
        // succeeded either way
        let _ = agent.receive_proposal(proposal.clone()).await;
        Ok(())
    }

    async fn send_prepare(&self, address: &str, vote: &PrepareVote) -> TransportResult<()> {
        let agent = self.lookup(address)?;
        let _ = agent.receive_prepare(vote.clone()).await;
        Ok(())
    }
}

/// Direct in-process client for a coordinator living in the same process
#[derive(Clone)]
pub struct InProcessCoordinator {
    inner: Arc<Coordinator>,
}

impl InProcessCoordinator {
    pub fn new(inner: Arc<Coordinator>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CoordinatorClient for InProcessCoordinator {
    async fn register(&self, request: &RegisterRequest) -> TransportResult<Identity> {
        self.inner
            .register_node(request.clone())
            .await
            .map_err(|err| TransportError::InvalidResponse(err.to_string()))
    }

    async fn fetch_registry(&self) -> TransportResult<RegistryView> {
        Ok(self.inner.registry().await)
    }

    async fn submit_proposal(&self, proposal: &Proposal) -> TransportResult<()> {
        self.inner.accept_proposal(proposal.clone()).await;
        Ok(())
    }

    async fn submit_commit_vote(&self, vote: &CommitVote) -> TransportResult<()> {
        // A rejected vote surfaces to the sender the same way an HTTP 400
        // would
        self.inner
            .accept_commit_vote(vote.clone())
            .await
            .map(|_| ())
            .map_err(|err| TransportError::InvalidResponse(err.to_string()))
    }
}
