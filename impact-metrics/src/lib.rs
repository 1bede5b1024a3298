//! Impact Metrics - venture pipeline model and derived-metric aggregation
//!
//! Turns stored rows (ventures, GEDSI metrics, activities, workflow runs)
//! into portfolio and venture level summary statistics:
//!
//! - [`portfolio_metrics`]: totals and averages over cached venture fields
//! - [`derive_fields`]: the cached fields of one venture, recomputed from its
//!   metrics and activities
//! - [`analytics_overview`]: period-scoped counts, rates and breakdowns
//! - [`summarize_monthly`] / [`weekly_windows`]: time-bucketed trends
//!
//! Everything here is pure and synchronous; loading and persisting rows is
//! the job of the pipeline crate.

pub mod aggregation;
pub mod analytics;
pub mod period;
pub mod recalculation;
pub mod trend;
pub mod types;

pub use aggregation::{
    category_completion, compliance_rate, percentage, portfolio_metrics, workflow_success_rate,
    PortfolioMetrics,
};
pub use analytics::{analytics_overview, AnalyticsOverview, AnalyticsSnapshot};
pub use period::AnalyticsPeriod;
pub use recalculation::derive_fields;
pub use trend::{summarize_monthly, weekly_windows, MonthlyBucket, TrendPoint, WeeklyBucket};
pub use types::*;
