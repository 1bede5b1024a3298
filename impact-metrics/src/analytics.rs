//! Analytics overview for a reporting period.
//!
//! The record store supplies counts and rows; [`analytics_overview`] turns
//! them into the three sections shown on the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregation::{category_completion, compliance_rate, count_by, workflow_success_rate};
use crate::period::AnalyticsPeriod;
use crate::trend::{summarize_monthly, MonthlyBucket, TrendPoint, WeeklyBucket};
use crate::types::{CategoryCompletion, GedsiMetric, Venture, WorkflowRun};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Everything the overview is computed from.
#[derive(Debug, Clone)]
pub struct AnalyticsSnapshot {
    pub period: AnalyticsPeriod,
    pub now: DateTime<Utc>,
    pub total_ventures: u64,
    pub ventures_in_period: u64,
    pub total_users: u64,
    pub users_in_period: u64,
    pub total_activities: u64,
    /// All ventures, for stage and sector breakdowns
    pub ventures: Vec<Venture>,
    /// All GEDSI metrics; compliance is not period-scoped
    pub metrics: Vec<GedsiMetric>,
    /// Workflow runs started within the period
    pub runs_in_period: Vec<WorkflowRun>,
    pub weekly_trend: Vec<WeeklyBucket>,
}

/// Headline counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct OverviewSection {
    pub period: AnalyticsPeriod,
    pub start_date: DateTime<Utc>,
    pub total_ventures: u64,
    pub ventures_in_period: u64,
    pub total_users: u64,
    pub users_in_period: u64,
    pub total_metrics: u64,
    pub total_activities: u64,
}

/// Rates and the weekly venture trend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSection {
    pub gedsi_compliance_rate: u32,
    pub workflow_success_rate: u32,
    pub workflow_runs: u64,
    pub weekly_trend: Vec<WeeklyBucket>,
}

/// Breakdowns and the monthly metric trend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct InsightsSection {
    pub ventures_by_stage: BTreeMap<String, u64>,
    pub ventures_by_sector: BTreeMap<String, u64>,
    pub category_completion: Vec<CategoryCompletion>,
    pub monthly_trend: Vec<MonthlyBucket>,
}

/// Result of the analytics overview operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AnalyticsOverview {
    pub overview: OverviewSection,
    pub performance: PerformanceSection,
    pub insights: InsightsSection,
}

/// Assemble the overview from a snapshot.
pub fn analytics_overview(snapshot: AnalyticsSnapshot) -> AnalyticsOverview {
    let AnalyticsSnapshot {
        period,
        now,
        total_ventures,
        ventures_in_period,
        total_users,
        users_in_period,
        total_activities,
        ventures,
        metrics,
        runs_in_period,
        weekly_trend,
    } = snapshot;

    let monthly_trend = summarize_monthly(metrics.iter().map(|m| TrendPoint::from_metric(m, now)));

    AnalyticsOverview {
        overview: OverviewSection {
            period,
            start_date: period.start_date(now),
            total_ventures,
            ventures_in_period,
            total_users,
            users_in_period,
            total_metrics: metrics.len() as u64,
            total_activities,
        },
        performance: PerformanceSection {
            gedsi_compliance_rate: compliance_rate(&metrics),
            workflow_success_rate: workflow_success_rate(&runs_in_period),
            workflow_runs: runs_in_period.len() as u64,
            weekly_trend,
        },
        insights: InsightsSection {
            ventures_by_stage: count_by(&ventures, |v| v.stage.as_str().to_string()),
            ventures_by_sector: count_by(&ventures, |v| v.sector.trim().to_lowercase()),
            category_completion: category_completion(&metrics),
            monthly_trend,
        },
    }
}
