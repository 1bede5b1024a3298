//! Time-bucketed summaries of metric and activity rows.
//!
//! Two bucketings are provided: calendar months keyed `YYYY-MM`, and six
//! trailing fixed-width weeks ending at a reference instant.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregation::percentage;
use crate::types::GedsiMetric;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Number of weekly windows in the performance trend.
pub const WEEKLY_WINDOWS: usize = 6;

/// A time-stamped row with a free-form status label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendPoint {
    pub created_at: DateTime<Utc>,
    pub status: String,
}

impl TrendPoint {
    pub fn new(created_at: DateTime<Utc>, status: impl Into<String>) -> Self {
        Self {
            created_at,
            status: status.into(),
        }
    }

    /// Point for a GEDSI metric, overdue-aware as of `as_of`.
    pub fn from_metric(metric: &GedsiMetric, as_of: DateTime<Utc>) -> Self {
        Self::new(metric.created_at, metric.trend_label(as_of))
    }
}

/// Status classes counted per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Verified,
    InProgress,
    Overdue,
}

/// Case-insensitive, whitespace-insensitive status match.
fn classify(status: &str) -> Option<StatusClass> {
    let normalized: String = status
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    match normalized.as_str() {
        "verified" => Some(StatusClass::Verified),
        "inprogress" => Some(StatusClass::InProgress),
        "overdue" => Some(StatusClass::Overdue),
        _ => None,
    }
}

/// Counters for one calendar month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
    /// `YYYY-MM`
    pub period: String,
    pub total: u64,
    pub verified: u64,
    pub in_progress: u64,
    pub overdue: u64,
    /// Verified share of `total`, rounded
    pub completion_rate: u32,
}

/// Bucket points by the year-month of their creation time.
///
/// Buckets come back in ascending key order, which for `YYYY-MM` keys is
/// chronological order.
pub fn summarize_monthly<I>(points: I) -> Vec<MonthlyBucket>
where
    I: IntoIterator<Item = TrendPoint>,
{
    let mut buckets: BTreeMap<String, MonthlyBucket> = BTreeMap::new();

    for point in points {
        let key = point.created_at.format("%Y-%m").to_string();
        let bucket = buckets.entry(key.clone()).or_insert_with(|| MonthlyBucket {
            period: key,
            ..Default::default()
        });

        bucket.total += 1;
        match classify(&point.status) {
            Some(StatusClass::Verified) => bucket.verified += 1,
            Some(StatusClass::InProgress) => bucket.in_progress += 1,
            Some(StatusClass::Overdue) => bucket.overdue += 1,
            None => {}
        }
    }

    buckets
        .into_values()
        .map(|mut bucket| {
            bucket.completion_rate = percentage(bucket.verified, bucket.total);
            bucket
        })
        .collect()
}

/// One trailing week of the performance trend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct WeeklyBucket {
    /// `Week 1` (oldest) through `Week 6` (ending now)
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Ventures created in `[start, end)`
    pub ventures: u64,
}

/// The six trailing 7-day windows ending at `now`, oldest first, with zero
/// counts. Callers fill `ventures` from a store count.
pub fn weekly_windows(now: DateTime<Utc>) -> Vec<WeeklyBucket> {
    (0..WEEKLY_WINDOWS)
        .map(|i| {
            let weeks_back = (WEEKLY_WINDOWS - i) as i64;
            let start = now - Duration::weeks(weeks_back);
            WeeklyBucket {
                label: format!("Week {}", i + 1),
                start,
                end: start + Duration::weeks(1),
                ventures: 0,
            }
        })
        .collect()
}
