//! Per-venture derived fields.
//!
//! [`derive_fields`] is the pure half of a venture recalculation: the record
//! store loads the venture's metrics and activities, this module computes the
//! cache, and the store writes it back with a fresh timestamp.

use crate::aggregation::{category_completion, compliance_rate, rounded_mean};
use crate::types::{Activity, DerivedFields, GedsiCategory, GedsiMetric};

/// Units counted as people reached.
const PEOPLE_UNITS: &[&str] = &[
    "people",
    "persons",
    "individuals",
    "beneficiaries",
    "participants",
    "women",
    "youth",
    "members",
];

/// Units counted as jobs.
const JOB_UNITS: &[&str] = &["jobs", "positions", "employees"];

/// Indicator code for youth engagement.
const YOUTH_CODE: &str = "OI.4";

/// Each logged activity adds this much engagement, up to 100.
const ENGAGEMENT_PER_ACTIVITY: u64 = 5;

fn unit_in(unit: &str, units: &[&str]) -> bool {
    let unit = unit.trim().to_lowercase();
    units.iter().any(|u| *u == unit)
}

fn is_people(metric: &GedsiMetric) -> bool {
    unit_in(&metric.unit, PEOPLE_UNITS)
}

fn is_youth(metric: &GedsiMetric) -> bool {
    metric.code.trim().eq_ignore_ascii_case(YOUTH_CODE)
        || metric.name.to_lowercase().contains("youth")
}

/// Progress toward target as a percentage in [0, 100].
///
/// A metric without a positive target is all-or-nothing on its status.
fn progress(metric: &GedsiMetric) -> u32 {
    if metric.target_value <= 0.0 {
        return if metric.status.is_done() { 100 } else { 0 };
    }
    let ratio = (metric.current_value.max(0.0) / metric.target_value).min(1.0);
    (ratio * 100.0).round() as u32
}

fn reach<F>(metrics: &[GedsiMetric], select: F) -> u64
where
    F: Fn(&GedsiMetric) -> bool,
{
    let total: f64 = metrics
        .iter()
        .filter(|&m| select(m))
        .map(|m| m.current_value.max(0.0))
        .sum();
    total.round() as u64
}

/// Compute every cached field of a venture from its metrics and activities.
pub fn derive_fields(metrics: &[GedsiMetric], activities: &[Activity]) -> DerivedFields {
    let gedsi_score = rounded_mean(metrics.iter().map(progress));
    let gedsi_compliance_rate = compliance_rate(metrics);
    let engagement = (activities.len() as u64 * ENGAGEMENT_PER_ACTIVITY).min(100) as f64;

    let social_impact_score = (0.5 * f64::from(gedsi_score)
        + 0.3 * f64::from(gedsi_compliance_rate)
        + 0.2 * engagement)
        .round() as u32;

    DerivedFields {
        gedsi_score,
        social_impact_score,
        gedsi_compliance_rate,
        total_beneficiaries: reach(metrics, is_people),
        jobs_created: reach(metrics, |m| unit_in(&m.unit, JOB_UNITS)),
        women_empowered: reach(metrics, |m| {
            is_people(m) && m.category == GedsiCategory::Gender
        }),
        disability_inclusive: reach(metrics, |m| {
            is_people(m) && m.category == GedsiCategory::Disability
        }),
        youth_engaged: reach(metrics, |m| is_people(m) && is_youth(m)),
        category_completion: category_completion(metrics),
    }
}
