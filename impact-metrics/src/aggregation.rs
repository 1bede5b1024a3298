//! Portfolio-wide rollups.
//!
//! Every ratio in this module guards its denominator and reports 0 instead
//! of NaN or infinity. Results are rounded to the nearest integer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{CategoryCompletion, GedsiCategory, GedsiMetric, RunStatus, Venture, WorkflowRun};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Message attached to an empty portfolio rollup.
pub const NO_VENTURES_MESSAGE: &str = "No ventures found";

/// `numerator / denominator × 100`, rounded, or 0 for an empty denominator.
pub fn percentage(numerator: u64, denominator: u64) -> u32 {
    if denominator == 0 {
        return 0;
    }
    (numerator as f64 / denominator as f64 * 100.0).round() as u32
}

/// Arithmetic mean rounded to the nearest integer, 0 for an empty input.
pub fn rounded_mean<I>(values: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), v| (sum + u64::from(v), count + 1));
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as u32
}

/// Portfolio totals and averages over the cached venture fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PortfolioMetrics {
    pub total_ventures: u64,
    pub total_beneficiaries: u64,
    pub total_jobs_created: u64,
    pub total_women_empowered: u64,
    pub total_disability_inclusive: u64,
    pub total_youth_engaged: u64,
    #[serde(rename = "averageGEDSIScore")]
    pub average_gedsi_score: u32,
    pub average_social_impact_score: u32,
    pub average_compliance_rate: u32,
    /// Set only when there is nothing to aggregate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Roll the cached derived fields of `ventures` up into portfolio totals.
pub fn portfolio_metrics(ventures: &[Venture]) -> PortfolioMetrics {
    if ventures.is_empty() {
        return PortfolioMetrics {
            message: Some(NO_VENTURES_MESSAGE.to_string()),
            ..Default::default()
        };
    }

    let mut metrics = PortfolioMetrics {
        total_ventures: ventures.len() as u64,
        ..Default::default()
    };

    for venture in ventures {
        let d = &venture.derived;
        metrics.total_beneficiaries += d.total_beneficiaries;
        metrics.total_jobs_created += d.jobs_created;
        metrics.total_women_empowered += d.women_empowered;
        metrics.total_disability_inclusive += d.disability_inclusive;
        metrics.total_youth_engaged += d.youth_engaged;
    }

    metrics.average_gedsi_score = rounded_mean(ventures.iter().map(|v| v.derived.gedsi_score));
    metrics.average_social_impact_score =
        rounded_mean(ventures.iter().map(|v| v.derived.social_impact_score));
    metrics.average_compliance_rate =
        rounded_mean(ventures.iter().map(|v| v.derived.gedsi_compliance_rate));

    metrics
}

/// Share of metrics in Completed or Verified status.
pub fn compliance_rate(metrics: &[GedsiMetric]) -> u32 {
    let done = metrics.iter().filter(|m| m.status.is_done()).count() as u64;
    percentage(done, metrics.len() as u64)
}

/// Completion broken down by the categories present, in category order.
pub fn category_completion(metrics: &[GedsiMetric]) -> Vec<CategoryCompletion> {
    let mut groups: BTreeMap<GedsiCategory, (u64, u64)> = BTreeMap::new();

    for metric in metrics {
        let entry = groups.entry(metric.category).or_default();
        entry.0 += 1;
        if metric.status.is_done() {
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(category, (total, completed))| CategoryCompletion {
            category,
            total,
            completed,
            completion_rate: percentage(completed, total),
        })
        .collect()
}

/// Share of runs that succeeded. Running runs count in the denominator.
pub fn workflow_success_rate(runs: &[WorkflowRun]) -> u32 {
    let succeeded = runs
        .iter()
        .filter(|r| r.status == RunStatus::Succeeded)
        .count() as u64;
    percentage(succeeded, runs.len() as u64)
}

/// Count ventures per key, e.g. per stage or per sector.
pub fn count_by<K, F>(ventures: &[Venture], key: F) -> BTreeMap<K, u64>
where
    K: Ord,
    F: Fn(&Venture) -> K,
{
    let mut counts = BTreeMap::new();
    for venture in ventures {
        *counts.entry(key(venture)).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DerivedFields, MetricStatus};
    use chrono::Utc;

    fn venture_with(derived: DerivedFields) -> Venture {
        let mut venture = Venture::new("Acme", "agriculture");
        venture.derived = derived;
        venture
    }

    #[test]
    fn test_empty_portfolio_is_zero_filled() {
        let metrics = portfolio_metrics(&[]);
        assert_eq!(metrics.total_ventures, 0);
        assert_eq!(metrics.total_beneficiaries, 0);
        assert_eq!(metrics.average_gedsi_score, 0);
        assert_eq!(metrics.average_compliance_rate, 0);
        assert_eq!(metrics.message.as_deref(), Some("No ventures found"));
    }

    #[test]
    fn test_portfolio_sums_and_rounded_averages() {
        let ventures = vec![
            venture_with(DerivedFields {
                gedsi_score: 70,
                social_impact_score: 40,
                gedsi_compliance_rate: 50,
                total_beneficiaries: 100,
                jobs_created: 4,
                women_empowered: 60,
                disability_inclusive: 5,
                youth_engaged: 20,
                ..Default::default()
            }),
            venture_with(DerivedFields {
                gedsi_score: 75,
                social_impact_score: 41,
                gedsi_compliance_rate: 0,
                total_beneficiaries: 50,
                jobs_created: 1,
                women_empowered: 10,
                disability_inclusive: 0,
                youth_engaged: 3,
                ..Default::default()
            }),
        ];

        let metrics = portfolio_metrics(&ventures);
        assert_eq!(metrics.total_ventures, 2);
        assert_eq!(metrics.total_beneficiaries, 150);
        assert_eq!(metrics.total_jobs_created, 5);
        assert_eq!(metrics.total_women_empowered, 70);
        assert_eq!(metrics.total_disability_inclusive, 5);
        assert_eq!(metrics.total_youth_engaged, 23);
        // 72.5 and 40.5 round half away from zero
        assert_eq!(metrics.average_gedsi_score, 73);
        assert_eq!(metrics.average_social_impact_score, 41);
        assert_eq!(metrics.average_compliance_rate, 25);
        assert!(metrics.message.is_none());
    }

    #[test]
    fn test_portfolio_serializes_dashboard_field_names() {
        let json = serde_json::to_value(portfolio_metrics(&[])).unwrap();
        assert!(json.get("averageGEDSIScore").is_some());
        assert!(json.get("totalJobsCreated").is_some());
        assert_eq!(json["message"], "No ventures found");
    }

    #[test]
    fn test_compliance_rate_without_metrics_is_zero() {
        assert_eq!(compliance_rate(&[]), 0);
    }

    #[test]
    fn test_category_completion_groups_present_categories() {
        let metrics = vec![
            GedsiMetric::new("v", "OI.1", "a", GedsiCategory::Gender)
                .with_status(MetricStatus::Verified),
            GedsiMetric::new("v", "OI.1", "b", GedsiCategory::Gender)
                .with_status(MetricStatus::InProgress),
            GedsiMetric::new("v", "OI.2", "c", GedsiCategory::Disability)
                .with_status(MetricStatus::Completed),
        ];

        let groups = category_completion(&metrics);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, GedsiCategory::Gender);
        assert_eq!(groups[0].completion_rate, 50);
        assert_eq!(groups[1].category, GedsiCategory::Disability);
        assert_eq!(groups[1].completion_rate, 100);
        assert_eq!(compliance_rate(&metrics), 67);
    }

    #[test]
    fn test_workflow_success_rate() {
        let now = Utc::now();
        let runs = vec![
            WorkflowRun::new("wf", RunStatus::Succeeded, now),
            WorkflowRun::new("wf", RunStatus::Succeeded, now),
            WorkflowRun::new("wf", RunStatus::Failed, now),
        ];
        assert_eq!(workflow_success_rate(&runs), 67);
        assert_eq!(workflow_success_rate(&[]), 0);
    }
}
