//! Activity trail for pipeline writes.
//!
//! Every venture and metric write leaves an activity row behind. The insert
//! runs on its own task and never fails the write that caused it. Writers
//! that recalculate afterwards await the returned handle first, since
//! engagement counts activity rows.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use impact_metrics::{Activity, ActivityType};

use crate::store::{RecordStore, StoreError};

/// Appends activity rows to the record store.
#[derive(Clone)]
pub struct ActivityLogger {
    store: Arc<dyn RecordStore>,
    failed: Arc<AtomicU64>,
}

impl ActivityLogger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record an activity in the background.
    ///
    /// The returned handle may be awaited or dropped; a failed insert is
    /// logged and counted, never returned.
    pub fn record(
        &self,
        venture_id: Option<&str>,
        user_id: Option<&str>,
        activity_type: ActivityType,
        title: impl Into<String>,
        description: impl Into<String>,
        metadata: serde_json::Value,
    ) -> JoinHandle<()> {
        let mut activity = Activity::new(activity_type, title)
            .with_description(description)
            .with_metadata(metadata);
        activity.venture_id = venture_id.map(str::to_string);
        activity.user_id = user_id.map(str::to_string);

        let logger = self.clone();
        tokio::spawn(async move {
            if let Err(e) = logger.append(&activity).await {
                logger.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    activity_type = %activity.activity_type,
                    venture_id = ?activity.venture_id,
                    error = %e,
                    "Failed to record activity"
                );
            }
        })
    }

    /// Append an activity and wait for the write.
    pub async fn append(&self, activity: &Activity) -> Result<(), StoreError> {
        self.store.append_activity(activity).await?;
        debug!(
            activity_id = %activity.id,
            activity_type = %activity.activity_type,
            "Activity recorded"
        );
        Ok(())
    }

    /// Number of background inserts that failed.
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RecordFilter, SqliteStore};
    use impact_metrics::Venture;

    #[tokio::test]
    async fn test_record_appends_in_background() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let venture = Venture::new("Acme", "Retail");
        store.insert_venture(&venture).await.unwrap();

        let logger = ActivityLogger::new(store.clone());
        logger
            .record(
                Some(&venture.id),
                Some("user-1"),
                ActivityType::Note,
                "Site visit",
                "Met the founding team",
                serde_json::json!({"visit": 1}),
            )
            .await
            .unwrap();

        let rows = store.activities(&RecordFilter::for_venture(&venture.id)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id.as_deref(), Some("user-1"));
        assert_eq!(rows[0].description, "Met the founding team");
        assert_eq!(logger.failed_count(), 0);
    }

    #[tokio::test]
    async fn test_append_surfaces_store_errors() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let logger = ActivityLogger::new(store);

        let activity = Activity::new(ActivityType::Note, "Once");
        logger.append(&activity).await.unwrap();
        assert!(logger.append(&activity).await.is_err());
    }
}
