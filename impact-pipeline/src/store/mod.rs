//! Record store for the venture pipeline.
//!
//! The pipeline talks to persistence only through [`RecordStore`]. The
//! bundled implementation is [`SqliteStore`], a single SQLite connection
//! behind a mutex.
//!
//! ## Tables
//!
//! - `ventures` - ventures with their cached derived fields (JSON)
//! - `gedsi_metrics` - GEDSI indicators per venture
//! - `activities` - append-only activity log
//! - `users`, `workflows`, `workflow_runs` - counted by analytics

pub mod schema;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use impact_metrics::{Activity, DerivedFields, GedsiMetric, User, Venture, Workflow, WorkflowRun};

pub use sqlite::SqliteStore;

/// Error types for the record store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Record collections that can be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Ventures,
    Metrics,
    Activities,
    Users,
    Workflows,
    WorkflowRuns,
}

/// Row filter shared by every list and count query.
///
/// `created_from` is inclusive, `created_until` exclusive. For workflow runs
/// the range applies to `started_at`. `venture_id` is ignored by collections
/// that have no venture reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub venture_id: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_until: Option<DateTime<Utc>>,
}

impl RecordFilter {
    /// Match everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Rows belonging to one venture.
    pub fn for_venture(venture_id: impl Into<String>) -> Self {
        Self {
            venture_id: Some(venture_id.into()),
            ..Default::default()
        }
    }

    /// Rows created at or after `from`.
    pub fn since(from: DateTime<Utc>) -> Self {
        Self {
            created_from: Some(from),
            ..Default::default()
        }
    }

    /// Rows created in `[from, until)`.
    pub fn between(from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            created_from: Some(from),
            created_until: Some(until),
            ..Default::default()
        }
    }
}

/// Persistence used by the pipeline.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Ventures matching the filter, newest first.
    async fn ventures(&self, filter: &RecordFilter) -> Result<Vec<Venture>, StoreError>;

    async fn venture(&self, id: &str) -> Result<Option<Venture>, StoreError>;

    async fn insert_venture(&self, venture: &Venture) -> Result<(), StoreError>;

    /// Overwrite the cached derived fields of one venture.
    async fn update_derived_fields(
        &self,
        id: &str,
        fields: &DerivedFields,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn metrics(&self, filter: &RecordFilter) -> Result<Vec<GedsiMetric>, StoreError>;

    async fn metric(&self, id: &str) -> Result<Option<GedsiMetric>, StoreError>;

    async fn insert_metric(&self, metric: &GedsiMetric) -> Result<(), StoreError>;

    async fn update_metric(&self, metric: &GedsiMetric) -> Result<(), StoreError>;

    async fn delete_metric(&self, id: &str) -> Result<(), StoreError>;

    async fn activities(&self, filter: &RecordFilter) -> Result<Vec<Activity>, StoreError>;

    /// Activities are never updated or deleted.
    async fn append_activity(&self, activity: &Activity) -> Result<(), StoreError>;

    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), StoreError>;

    async fn insert_workflow_run(&self, run: &WorkflowRun) -> Result<(), StoreError>;

    async fn workflow_runs(&self, filter: &RecordFilter) -> Result<Vec<WorkflowRun>, StoreError>;

    async fn count(&self, kind: EntityKind, filter: &RecordFilter) -> Result<u64, StoreError>;
}
