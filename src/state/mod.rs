pub mod lifecycle;
mod moderation;
pub mod suppression;
mod tally;

use crate::config::ContestConfig;
use crate::store::RecordStore;
use crate::transport::ChatTransport;
use std::sync::Arc;
use suppression::SuppressionSet;
use tokio::sync::Mutex;

pub use lifecycle::{ConfirmedSubmission, PendingSubmission};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub transport: Arc<dyn ChatTransport>,
    pub config: Arc<ContestConfig>,
    /// Single writer gate for submission and vote mutations. The suppression
    /// set lives behind it so inserts and consumes share one lock.
    gate: Arc<Mutex<SuppressionSet>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        transport: Arc<dyn ChatTransport>,
        config: ContestConfig,
    ) -> Self {
        let suppression =
            SuppressionSet::new(config.suppression_capacity, config.suppression_ttl);
        Self {
            store,
            transport,
            config: Arc::new(config),
            gate: Arc::new(Mutex::new(suppression)),
        }
    }

    /// Number of self-caused deletions still awaiting their delete event
    pub async fn pending_suppressions(&self) -> usize {
        self.gate.lock().await.len()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::store::MemoryStore;
    use crate::transport::MemoryTransport;

    /// State backed by a memory store and transport, with submissions open
    pub async fn open_state() -> (AppState, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            transport.clone(),
            ContestConfig::default(),
        );
        state.set_submissions_open(true).await.unwrap();
        (state, transport)
    }
}
