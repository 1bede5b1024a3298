//! Background recalculation after writes.
//!
//! A write that changes a venture's inputs calls
//! [`RecalculationTrigger::trigger`], which spawns the recalculation and
//! returns at once. Failures are logged and counted; the write that caused
//! the recalculation has already succeeded and stays that way. Two racing
//! recalculations of the same venture are not coordinated: the later write
//! wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use impact_metrics::DerivedFields;

use crate::recalculation::recalculate_venture;
use crate::store::RecordStore;

/// How a background recalculation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecalcOutcome {
    Completed(DerivedFields),
    Failed(String),
}

/// Completion signal for one triggered recalculation.
///
/// Dropping the handle detaches the task; it still runs to completion.
#[derive(Debug)]
pub struct RecalcHandle {
    venture_id: String,
    task: JoinHandle<RecalcOutcome>,
}

impl RecalcHandle {
    pub fn venture_id(&self) -> &str {
        &self.venture_id
    }

    /// Wait for the recalculation to end.
    pub async fn wait(self) -> RecalcOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => RecalcOutcome::Failed(format!("Recalculation task aborted: {}", e)),
        }
    }
}

#[derive(Debug, Default)]
struct TriggerStats {
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Spawns venture recalculations.
#[derive(Clone)]
pub struct RecalculationTrigger {
    store: Arc<dyn RecordStore>,
    stats: Arc<TriggerStats>,
}

impl RecalculationTrigger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            stats: Arc::new(TriggerStats::default()),
        }
    }

    /// Start recalculating `venture_id` in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn trigger(&self, venture_id: impl Into<String>) -> RecalcHandle {
        let venture_id = venture_id.into();
        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);
        let id = venture_id.clone();

        let task = tokio::spawn(async move {
            match recalculate_venture(store.as_ref(), &id).await {
                Ok(fields) => {
                    stats.completed.fetch_add(1, Ordering::Relaxed);
                    debug!(venture_id = %id, "Background recalculation completed");
                    RecalcOutcome::Completed(fields)
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(venture_id = %id, error = %e, "Background recalculation failed");
                    RecalcOutcome::Failed(e.to_string())
                }
            }
        });

        RecalcHandle { venture_id, task }
    }

    /// Recalculations that finished successfully.
    pub fn completed(&self) -> u64 {
        self.stats.completed.load(Ordering::Relaxed)
    }

    /// Recalculations that failed.
    pub fn failed(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }
}
