/// Central consensus coordinator
///
/// Owns the authoritative node registry, records the active round's
/// proposal, tallies commit votes, and appends committed blocks to the
/// ledger. The commit decision requires a verified commit vote from
/// every registered node (unanimity, not a fault-tolerant quorum).
///
/// All round state (active proposal + vote tally) lives behind a single
/// mutex, and the tally insertion is evaluated together with the commit
/// check as one critical section: two votes arriving simultaneously can
/// never both observe a full tally and double-commit.

use crate::crypto::{verify_hex, PublicKey};
use crate::events::EventLog;
use crate::ledger::{Block, Ledger, LedgerError};
use crate::messages::{CommitVote, Proposal, RegisterRequest, COMMIT_PAYLOAD};
use crate::registry::{Identity, Registry, RegistryView};
use chrono::Utc;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Unknown node: {0}")]
    UnknownNode(u64),

    #[error("Invalid signature from node {0}")]
    InvalidSignature(u64),

    #[error("Public key is not a valid P-256 point")]
    InvalidPublicKey,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Outcome of a successfully tallied commit vote
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The vote completed the tally and this block was committed
    Committed(Block),
    /// The vote was recorded; the round is still open
    Pending { votes: usize, required: usize },
}

/// Per-round mutable state, guarded as one unit
#[derive(Default)]
struct RoundState {
    proposal: Option<Proposal>,
    commit_votes: BTreeMap<u64, CommitVote>,
}

pub struct Coordinator {
    registry: RwLock<Registry>,
    round: Mutex<RoundState>,
    ledger: Ledger,
    events: EventLog,
}

impl Coordinator {
    pub fn new(ledger: Ledger) -> Self {
        Self::with_event_capacity(ledger, 1024)
    }

    pub fn with_event_capacity(ledger: Ledger, event_capacity: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::new()),
            round: Mutex::new(RoundState::default()),
            ledger,
            events: EventLog::new(event_capacity),
        }
    }

    /// Register a node. Idempotent upsert: re-registering a node_id
    /// replaces its identity. The call itself is unauthenticated.
    pub async fn register_node(&self, request: RegisterRequest) -> Result<Identity> {
        // Reject keys that could never verify anything
        PublicKey::from_hex(&request.public_key).map_err(|_| CoordinatorError::InvalidPublicKey)?;

        let node_id = request.node_id;
        let identity = self.registry.write().await.register(Identity::from(request));
        self.events
            .record(Some(node_id), format!("Node {node_id}: registered with coordinator"));
        Ok(identity)
    }

    /// Read-only registry snapshot
    pub async fn registry(&self) -> RegistryView {
        self.registry.read().await.snapshot()
    }

    /// Record the active round's proposal. Recording is observational:
    /// it never drives the commit decision. A proposal starting a fresh
    /// round clears any votes left over from an abandoned one, so stale
    /// votes cannot leak into the new tally.
    pub async fn accept_proposal(&self, proposal: Proposal) {
        let mut round = self.round.lock().await;
        if round.proposal.is_none() && !round.commit_votes.is_empty() {
            warn!(
                stale_votes = round.commit_votes.len(),
                "clearing votes from abandoned round"
            );
            round.commit_votes.clear();
        }
        self.events.record(
            Some(proposal.node_id),
            format!(
                "Received block proposal '{}' from node {}",
                proposal.block_data, proposal.node_id
            ),
        );
        round.proposal = Some(proposal);
    }

    /// Verify and tally a commit vote, committing the block if the vote
    /// completes the tally.
    ///
    /// The vote is verified against the registry's current key for the
    /// claimed node_id; unknown nodes and bad signatures are rejected
    /// with no state change. Accepted votes accumulate idempotently
    /// (keyed by node_id, last write wins), so a resend never
    /// double-counts.
    pub async fn accept_commit_vote(&self, vote: CommitVote) -> Result<CommitOutcome> {
        let registry = self.registry.read().await;
        let public_key = registry
            .get(vote.node_id)
            .map(|identity| identity.public_key.clone())
            .ok_or(CoordinatorError::UnknownNode(vote.node_id))?;

        if !verify_hex(&public_key, COMMIT_PAYLOAD, &vote.signature) {
            warn!(node_id = vote.node_id, "rejected commit vote: invalid signature");
            return Err(CoordinatorError::InvalidSignature(vote.node_id));
        }

        let required = registry.len();
        let node_id = vote.node_id;

        // Tally insertion and commit check form one critical section.
        // The registry read lock is held across it so `required` is the
        // registry size at commit-check time.
        let mut round = self.round.lock().await;
        round.commit_votes.insert(node_id, vote);
        self.events
            .record(Some(node_id), format!("Received commit vote from node {node_id}"));

        let votes = round.commit_votes.len();
        if votes < required {
            return Ok(CommitOutcome::Pending { votes, required });
        }

        // Full tally but nothing to build a block from: hold the votes
        // and wait for a proposal.
        let Some(proposal) = round.proposal.take() else {
            warn!("commit tally complete but no active proposal; waiting");
            return Ok(CommitOutcome::Pending { votes, required });
        };

        let block = Block {
            block_data: proposal.block_data,
            committed_by: proposal.node_id,
            commit_time: Utc::now().to_rfc3339(),
        };
        self.ledger.append(block.clone())?;
        round.commit_votes.clear();
        self.events.record(
            None,
            format!(
                "Consensus reached: committed block '{}' proposed by node {}",
                block.block_data, block.committed_by
            ),
        );
        Ok(CommitOutcome::Committed(block))
    }

    /// Full committed block sequence, reloaded from the durable store
    pub fn ledger(&self) -> Result<Vec<Block>> {
        Ok(self.ledger.load()?)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }
}
