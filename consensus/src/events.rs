/// Protocol event narration
///
/// Human-readable observability feed mirroring what the `tracing` output
/// says about each protocol step. Events are kept in a bounded in-memory
/// history (served over HTTP) and fanned out to live subscribers on a
/// broadcast channel. Observers never influence protocol decisions.

use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::info;

/// One narrated protocol step
#[derive(Clone, Debug, Serialize)]
pub struct ProtocolEvent {
    /// Node the event concerns, if any
    pub node_id: Option<u64>,
    pub message: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

/// Bounded event history plus live broadcast fan-out
pub struct EventLog {
    history: Mutex<VecDeque<ProtocolEvent>>,
    capacity: usize,
    tx: broadcast::Sender<ProtocolEvent>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            history: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            tx,
        }
    }

    /// Record an event: log it, retain it, and offer it to subscribers.
    pub fn record(&self, node_id: Option<u64>, message: impl Into<String>) {
        let event = ProtocolEvent {
            node_id,
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
        };
        info!(node_id = ?event.node_id, "{}", event.message);

        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        if history.len() == self.capacity {
            history.pop_front();
        }
        history.push_back(event.clone());
        drop(history);

        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    /// Snapshot of retained events, oldest first
    pub fn history(&self) -> Vec<ProtocolEvent> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.iter().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProtocolEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(1024)
    }
}
