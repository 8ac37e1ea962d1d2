//! Analysis lifecycle notifications
//!
//! An in-process hook: components inside the server can subscribe to learn when an analysis
//! reaches a terminal state without querying the store. Nothing is pushed to HTTP clients; they
//! observe progress by polling `GET /api/v1/analyses/:id`.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::AnalysisStatus;

/// Default number of events buffered per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// An analysis reached a terminal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisEvent {
    pub analysis_id: Uuid,
    pub status: AnalysisStatus,
}

/// Broadcast channel for [`AnalysisEvent`]s
#[derive(Debug, Clone)]
pub struct AnalysisEvents {
    sender: broadcast::Sender<AnalysisEvent>,
}

impl AnalysisEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: AnalysisEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No subscribers for analysis event");
        }
    }

    /// Receive every event published from now on; a subscriber lagging more than the channel
    /// capacity behind loses the oldest events
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.sender.subscribe()
    }
}

impl Default for AnalysisEvents {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
