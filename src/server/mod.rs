pub mod matchmaker;
pub mod session;

use crate::inference::InferenceHandle;
use crate::protocol::ServerEnvelope;
use crate::store::Stores;
use dashmap::DashMap;
use matchmaker::Matchmaker;
use session::Session;
use std::sync::Arc;

/// Process-wide services, constructed once at startup and shared by every
/// connection. Nothing here is touched at import time.
pub struct AppState {
    pub connections: DashMap<String, Arc<Session>>,
    pub stores: Stores,
    pub matchmaker: Matchmaker,
    pub inference: Option<InferenceHandle>,
    pub max_players: usize,
    pub detailed_logs: bool,
    pub feedback_webhook: Option<String>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        stores: Stores,
        inference: Option<InferenceHandle>,
        max_players: usize,
        detailed_logs: bool,
        feedback_webhook: Option<String>,
    ) -> Self {
        Self {
            connections: DashMap::new(),
            stores,
            matchmaker: Matchmaker::new(),
            inference,
            max_players,
            detailed_logs,
            feedback_webhook,
            http: reqwest::Client::new(),
        }
    }

    /// Tells every live session how many connections exist. The connection
    /// table is only read to collect targets; the actual sends go through
    /// each session's outbound queue.
    pub fn broadcast_session_count(&self) {
        let count = self.connections.len();
        let targets: Vec<Arc<Session>> = self
            .connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let envelope = ServerEnvelope::update_counts(count);
        for target in targets {
            target.send(&envelope);
        }
    }
}
