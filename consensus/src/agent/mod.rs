/// Per-node protocol agent
///
/// Drives the propose → prepare → commit state machine for one peer.
/// The agent loops round after round with no terminal state:
///
/// - primary path: `Idle` → `AwaitingPrepares` → `Idle`
/// - replica path: `Idle` → `Voting` → `Idle`
///
/// All round state lives behind a single mutex. Message sends are the
/// only suspending operations and are always performed with the lock
/// released, so a slow or unreachable peer cannot stall the handling of
/// other inbound messages. Send failures are logged and never abort the
/// state machine: a failed delivery to one peer does not block fan-out
/// to the rest.

use crate::crypto::{verify_hex, SecretKey};
use crate::messages::{CommitVote, PrepareVote, Proposal, RegisterRequest, PREPARED_PAYLOAD};
use crate::network::{CoordinatorClient, PeerTransport, TransportError};
use crate::registry::{Identity, RegistryView};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Block data must not be empty")]
    EmptyBlockData,

    #[error("Round already in progress (state: {0:?})")]
    RoundInProgress(AgentState),

    #[error("Unknown node: {0}")]
    UnknownNode(u64),

    #[error("Invalid signature from node {0}")]
    InvalidSignature(u64),

    #[error("Not collecting prepare votes")]
    NotCollecting,
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Observable protocol state of an agent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentState {
    /// Between rounds; the only state that accepts a new proposal
    Idle,
    /// Acting as primary, collecting prepare votes from every peer
    AwaitingPrepares,
    /// Commit vote in flight; transient on both paths
    Voting,
}

/// Mutable round state, guarded as one unit
struct RoundLocal {
    state: AgentState,
    is_primary: bool,
    current_primary: Option<u64>,
    proposal: Option<Proposal>,
    prepares: BTreeMap<u64, PrepareVote>,
}

impl RoundLocal {
    fn new() -> Self {
        Self {
            state: AgentState::Idle,
            is_primary: false,
            current_primary: None,
            proposal: None,
            prepares: BTreeMap::new(),
        }
    }
}

pub struct NodeAgent {
    node_id: u64,
    secret: SecretKey,
    registry: RwLock<RegistryView>,
    round: Mutex<RoundLocal>,
    transport: Arc<dyn PeerTransport>,
    coordinator: Arc<dyn CoordinatorClient>,
}

impl NodeAgent {
    pub fn new(
        node_id: u64,
        secret: SecretKey,
        transport: Arc<dyn PeerTransport>,
        coordinator: Arc<dyn CoordinatorClient>,
    ) -> Self {
        Self {
            node_id,
            secret,
            registry: RwLock::new(RegistryView::default()),
            round: Mutex::new(RoundLocal::new()),
            transport,
            coordinator,
        }
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    /// Hex public key other nodes verify this agent's messages against
    pub fn public_key_hex(&self) -> String {
        self.secret.public_key().to_hex()
    }

    pub async fn state(&self) -> AgentState {
        self.round.lock().await.state
    }

    /// Local registry snapshot
    pub async fn registry_view(&self) -> RegistryView {
        self.registry.read().await.clone()
    }

    /// Announce this node's identity to the coordinator
    pub async fn register_with_coordinator(
        &self,
        advertise_addr: &str,
    ) -> std::result::Result<Identity, TransportError> {
        let request = RegisterRequest {
            node_id: self.node_id,
            public_key: self.public_key_hex(),
            address: advertise_addr.to_string(),
        };
        let identity = self.coordinator.register(&request).await?;
        info!(node_id = self.node_id, address = advertise_addr, "registered with coordinator");
        Ok(identity)
    }

    /// Become primary for a round: sign a proposal over
    /// `"<node_id>:<block_data>"` and fan it out to the coordinator and
    /// every other registered peer.
    ///
    /// Fails with no state change if `block_data` is empty or a round is
    /// already in progress.
    pub async fn propose_block(&self, block_data: &str) -> Result<()> {
        if block_data.is_empty() {
            return Err(AgentError::EmptyBlockData);
        }

        let proposal = {
            let mut round = self.round.lock().await;
            if round.state != AgentState::Idle {
                return Err(AgentError::RoundInProgress(round.state));
            }
            let proposal = Proposal::signed(self.node_id, block_data, &self.secret);
            round.state = AgentState::AwaitingPrepares;
            round.is_primary = true;
            round.current_primary = Some(self.node_id);
            round.proposal = Some(proposal.clone());
            round.prepares.clear();
            proposal
        };

        info!(node_id = self.node_id, block_data, "proposing block as primary");
        let view = self.registry_view().await;

        if let Err(err) = self.coordinator.submit_proposal(&proposal).await {
            warn!(node_id = self.node_id, %err, "failed to send proposal to coordinator");
        }
        for peer in view.peers_excluding(self.node_id) {
            if let Err(err) = self.transport.send_proposal(&peer.address, &proposal).await {
                warn!(
                    node_id = self.node_id,
                    peer = peer.node_id,
                    %err,
                    "failed to send proposal to peer"
                );
            }
        }
        Ok(())
    }

    /// Handle a proposal from this round's primary.
    ///
    /// The signature is verified over `"<proposer_id>:<block_data>"`
    /// against the proposer's currently-known key; unknown proposers and
    /// bad signatures are dropped with no state change. On success the
    /// replica sends a prepare vote to the primary and immediately sends
    /// its own commit vote to the coordinator; it does not wait for any
    /// post-quorum signal from the primary.
    pub async fn receive_proposal(&self, proposal: Proposal) -> Result<()> {
        let view = self.registry_view().await;
        let public_key = view
            .public_key_of(proposal.node_id)
            .ok_or(AgentError::UnknownNode(proposal.node_id))?;
        if !verify_hex(public_key, &proposal.payload(), &proposal.signature) {
            warn!(
                node_id = self.node_id,
                proposer = proposal.node_id,
                "failed to verify primary's proposal"
            );
            return Err(AgentError::InvalidSignature(proposal.node_id));
        }

        let primary_id = proposal.node_id;
        {
            let mut round = self.round.lock().await;
            if round.state != AgentState::Idle {
                return Err(AgentError::RoundInProgress(round.state));
            }
            round.state = AgentState::Voting;
            round.is_primary = false;
            round.current_primary = Some(primary_id);
            round.proposal = Some(proposal);
        }
        info!(node_id = self.node_id, primary = primary_id, "verified primary's proposal");

        if let Some(primary_addr) = view.address_of(primary_id) {
            let prepare = PrepareVote::signed(self.node_id, &self.secret);
            if let Err(err) = self.transport.send_prepare(primary_addr, &prepare).await {
                warn!(node_id = self.node_id, primary = primary_id, %err, "failed to send prepare vote");
            }
        } else {
            warn!(node_id = self.node_id, primary = primary_id, "no address for primary; skipping prepare");
        }
        self.send_commit_vote().await;

        self.round.lock().await.state = AgentState::Idle;
        Ok(())
    }

    /// Handle a replica's prepare vote while acting as primary.
    ///
    /// Votes are verified over the literal `"prepared"`; unknown voters
    /// and bad signatures are dropped. Accumulation is keyed by node_id
    /// (a resend overwrites, never duplicates). Once every other
    /// registered peer has prepared, the primary sends its own commit
    /// vote to the coordinator and the round returns to `Idle`.
    pub async fn receive_prepare(&self, vote: PrepareVote) -> Result<()> {
        let view = self.registry_view().await;
        let public_key = view
            .public_key_of(vote.node_id)
            .ok_or(AgentError::UnknownNode(vote.node_id))?;
        if !verify_hex(public_key, PREPARED_PAYLOAD, &vote.signature) {
            warn!(node_id = self.node_id, voter = vote.node_id, "dropping invalid prepare vote");
            return Err(AgentError::InvalidSignature(vote.node_id));
        }

        let quorum = view.len().saturating_sub(1);
        let reached = {
            let mut round = self.round.lock().await;
            if !round.is_primary || round.state != AgentState::AwaitingPrepares {
                return Err(AgentError::NotCollecting);
            }
            let voter = vote.node_id;
            round.prepares.insert(voter, vote);
            debug!(
                node_id = self.node_id,
                voter,
                prepares = round.prepares.len(),
                quorum,
                "recorded prepare vote"
            );
            if round.prepares.len() >= quorum {
                // Claim the transition so a concurrent prepare cannot
                // trigger a second commit vote
                round.state = AgentState::Voting;
                true
            } else {
                false
            }
        };

        if reached {
            info!(node_id = self.node_id, "received all prepare votes");
            self.send_commit_vote().await;
            let mut round = self.round.lock().await;
            round.state = AgentState::Idle;
            round.is_primary = false;
            round.prepares.clear();
        }
        Ok(())
    }

    /// Pull the latest registry from the coordinator and replace the
    /// local snapshot if it changed. Returns whether it changed.
    pub async fn refresh_registry(&self) -> std::result::Result<bool, TransportError> {
        let latest = self.coordinator.fetch_registry().await?;
        let mut registry = self.registry.write().await;
        if *registry != latest {
            debug!(node_id = self.node_id, nodes = latest.len(), "updated registry snapshot");
            *registry = latest;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Background task refreshing the registry on a fixed interval,
    /// independent of round state.
    pub fn spawn_registry_refresh(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = agent.refresh_registry().await {
                    warn!(node_id = agent.node_id, %err, "registry refresh failed");
                }
            }
        })
    }

    async fn send_commit_vote(&self) {
        let vote = CommitVote::signed(self.node_id, &self.secret);
        match self.coordinator.submit_commit_vote(&vote).await {
            Ok(()) => info!(node_id = self.node_id, "sent commit vote to coordinator"),
            Err(err) => warn!(node_id = self.node_id, %err, "failed to send commit vote"),
        }
    }
}
