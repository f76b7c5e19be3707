//! Shared application state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use spamshield_core::SpamShieldConfig;
use spamshield_runtime::{TaggingOrchestrator, TaggingReport};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: SpamShieldConfig,
    pub orchestrator: Arc<TaggingOrchestrator>,
    last_report: RwLock<Option<TaggingReport>>,
    runs: AtomicU64,
}

impl AppState {
    pub fn new(config: SpamShieldConfig, orchestrator: TaggingOrchestrator) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
            last_report: RwLock::new(None),
            runs: AtomicU64::new(0),
        }
    }

    /// Remember the outcome of a finished run for `/api/status`.
    pub fn record_run(&self, report: &TaggingReport) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        *self.last_report.write() = Some(report.clone());
    }

    pub fn last_report(&self) -> Option<TaggingReport> {
        self.last_report.read().clone()
    }

    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }
}
