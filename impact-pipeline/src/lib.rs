//! Impact Pipeline - venture pipeline service
//!
//! Everything between the record store and the dashboard:
//! - SQLite record store behind the [`RecordStore`] trait
//! - Derived-field recalculation, awaited or triggered in the background
//! - Portfolio metrics, analytics overview and metric trends
//! - Public intake submissions with a bounded rate limiter
//! - Venture scoring through [`venture_scorer::VentureScorer`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Pipeline                  │
//! │   (reads, writes, intake, scoring)      │
//! └────┬──────────────┬──────────────┬──────┘
//!      ▼              ▼              ▼
//! ┌──────────┐  ┌───────────┐  ┌───────────┐
//! │ Record   │  │ Recalc    │  │ Venture   │
//! │ Store    │  │ Trigger   │  │ Scorer    │
//! └──────────┘  └───────────┘  └───────────┘
//! ```

pub mod activity;
pub mod config;
pub mod error;
pub mod intake;
pub mod outcome;
pub mod pipeline;
pub mod recalculation;
pub mod store;
pub mod trigger;

// Re-export main types for convenience
pub use activity::ActivityLogger;
pub use config::{Args, Command, PipelineConfig};
pub use error::{NumberInput, PipelineError, ValidationError};
pub use intake::{
    FounderTypesInput, IntakeRateLimiter, IntakeReceipt, IntakeSubmission, RateDecision,
};
pub use outcome::ApiOutcome;
pub use pipeline::{MetricInput, MetricUpdate, Pipeline, RecalcSummary, Written};
pub use store::{EntityKind, RecordFilter, RecordStore, SqliteStore, StoreError};
pub use trigger::{RecalcHandle, RecalcOutcome, RecalculationTrigger};
