//! Last-write-wins lifecycle status cell.
//!
//! The supervisor and channel publish into this cell as a side effect of
//! health changes; UI code observes it. States are not queued — readers
//! always see the latest write, and no transition triggers side effects
//! beyond observation.

use std::sync::Arc;

use tokio::sync::watch;

use scribe_types::EngineStatus;

/// One published state plus an optional human-readable message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub state: EngineStatus,
    pub message: Option<String>,
}

/// Shared status cell. Cloning is cheap and observes the same cell.
#[derive(Debug, Clone)]
pub struct StatusCell {
    tx: Arc<watch::Sender<StatusReport>>,
}

impl StatusCell {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tx: Arc::new(watch::channel(StatusReport::default()).0),
        }
    }

    /// Publish a new state, replacing whatever was there.
    pub fn set(&self, state: EngineStatus, message: impl Into<String>) {
        self.tx.send_replace(StatusReport {
            state,
            message: Some(message.into()),
        });
    }

    /// Publish a new state with no message.
    pub fn set_state(&self, state: EngineStatus) {
        self.tx.send_replace(StatusReport {
            state,
            message: None,
        });
    }

    /// The latest report.
    #[must_use]
    pub fn get(&self) -> StatusReport {
        self.tx.borrow().clone()
    }

    /// Subscribe to status changes. The receiver starts at the current
    /// value.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StatusReport> {
        self.tx.subscribe()
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}
