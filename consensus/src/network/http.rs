/// HTTP bindings for the protocol messages
///
/// Every message travels as JSON over plain HTTP. The coordinator and
/// each peer expose a small axum router; outbound delivery goes through
/// reqwest clients implementing the transport traits. Routing carries
/// messages only; all protocol decisions stay in the agent and the
/// coordinator.

use super::{CoordinatorClient, PeerTransport, TransportResult};
use crate::agent::NodeAgent;
use crate::coordinator::{Coordinator, CoordinatorError};
use crate::messages::{CommitVote, PrepareVote, Proposal, RegisterRequest};
use crate::registry::{Identity, RegistryView};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// reqwest-backed delivery to peer endpoints
#[derive(Clone, Default)]
pub struct HttpPeerTransport {
    client: reqwest::Client,
}

impl HttpPeerTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PeerTransport for HttpPeerTransport {
    async fn send_proposal(&self, address: &str, proposal: &Proposal) -> TransportResult<()> {
        self.client
            .post(endpoint(address, "/receive_proposal"))
            .json(proposal)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn send_prepare(&self, address: &str, vote: &PrepareVote) -> TransportResult<()> {
        self.client
            .post(endpoint(address, "/receive_prepare"))
            .json(vote)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// reqwest-backed client for the coordinator's endpoints
#[derive(Clone)]
pub struct HttpCoordinatorClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCoordinatorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CoordinatorClient for HttpCoordinatorClient {
    async fn register(&self, request: &RegisterRequest) -> TransportResult<Identity> {
        let identity = self
            .client
            .post(endpoint(&self.base_url, "/register_node"))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(identity)
    }

    async fn fetch_registry(&self) -> TransportResult<RegistryView> {
        let view = self
            .client
            .get(endpoint(&self.base_url, "/public_keys"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(view)
    }

    async fn submit_proposal(&self, proposal: &Proposal) -> TransportResult<()> {
        self.client
            .post(endpoint(&self.base_url, "/propose_block"))
            .json(proposal)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn submit_commit_vote(&self, vote: &CommitVote) -> TransportResult<()> {
        self.client
            .post(endpoint(&self.base_url, "/commit_message"))
            .json(vote)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Routes served by the coordinator process
pub fn coordinator_router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/register_node", post(register_node))
        .route("/public_keys", get(public_keys))
        .route("/propose_block", post(record_proposal))
        .route("/commit_message", post(commit_message))
        .route("/blockchain", get(blockchain))
        .route("/logs", get(logs))
        .with_state(coordinator)
}

async fn register_node(
    State(coordinator): State<Arc<Coordinator>>,
    Json(request): Json<RegisterRequest>,
) -> (StatusCode, Json<Value>) {
    match coordinator.register_node(request).await {
        Ok(identity) => (StatusCode::CREATED, Json(json!(identity))),
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "failed", "message": err.to_string() })),
        ),
    }
}

async fn public_keys(State(coordinator): State<Arc<Coordinator>>) -> Json<RegistryView> {
    Json(coordinator.registry().await)
}

async fn record_proposal(
    State(coordinator): State<Arc<Coordinator>>,
    Json(proposal): Json<Proposal>,
) -> Json<Value> {
    coordinator.accept_proposal(proposal).await;
    Json(json!({ "status": "received" }))
}

async fn commit_message(
    State(coordinator): State<Arc<Coordinator>>,
    Json(vote): Json<CommitVote>,
) -> (StatusCode, Json<Value>) {
    use crate::coordinator::CommitOutcome;

    match coordinator.accept_commit_vote(vote).await {
        Ok(CommitOutcome::Committed(_)) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "message": "Block committed." })),
        ),
        Ok(CommitOutcome::Pending { .. }) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "message": "Commit vote received." })),
        ),
        Err(err @ (CoordinatorError::UnknownNode(_) | CoordinatorError::InvalidSignature(_))) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "failed", "message": err.to_string() })),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "failed", "message": err.to_string() })),
        ),
    }
}

async fn blockchain(
    State(coordinator): State<Arc<Coordinator>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match coordinator.ledger() {
        Ok(blocks) => Ok(Json(json!(blocks))),
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "failed", "message": err.to_string() })),
        )),
    }
}

async fn logs(State(coordinator): State<Arc<Coordinator>>) -> Json<Value> {
    Json(json!(coordinator.events().history()))
}

/// Routes served by each peer process
pub fn peer_router(agent: Arc<NodeAgent>) -> Router {
    Router::new()
        .route("/receive_proposal", post(receive_proposal))
        .route("/receive_prepare", post(receive_prepare))
        .route("/propose_block", post(propose_block))
        .route("/status", get(status))
        .with_state(agent)
}

async fn receive_proposal(
    State(agent): State<Arc<NodeAgent>>,
    Json(proposal): Json<Proposal>,
) -> Json<Value> {
    // Invalid proposals are dropped, not reported back to the sender
    if let Err(err) = agent.receive_proposal(proposal).await {
        warn!(node_id = agent.node_id(), %err, "dropped proposal");
    }
    Json(json!({ "status": "received" }))
}

async fn receive_prepare(
    State(agent): State<Arc<NodeAgent>>,
    Json(vote): Json<PrepareVote>,
) -> Json<Value> {
    if let Err(err) = agent.receive_prepare(vote).await {
        warn!(node_id = agent.node_id(), %err, "dropped prepare vote");
    }
    Json(json!({ "status": "received" }))
}

#[derive(Deserialize)]
struct ProposeRequest {
    #[serde(default)]
    block_data: String,
}

async fn propose_block(
    State(agent): State<Arc<NodeAgent>>,
    Json(request): Json<ProposeRequest>,
) -> (StatusCode, Json<Value>) {
    match agent.propose_block(&request.block_data).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "message": "Block proposal initiated." })),
        ),
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "failed", "message": err.to_string() })),
        ),
    }
}

async fn status(State(agent): State<Arc<NodeAgent>>) -> Json<Value> {
    Json(json!({ "status": "running", "node_id": agent.node_id() }))
}
