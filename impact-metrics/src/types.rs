//! Core records of the venture pipeline.
//!
//! These mirror the rows persisted by the record store. Ventures carry a set
//! of cached derived fields which are recomputed from their GEDSI metrics and
//! activities; the cache is advisory and never a source of truth.
//!
//! With the `typescript` feature enabled, the wire types can be exported to
//! TypeScript using ts-rs for the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Error raised when a stored label does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownVariant {
    /// Which enumeration was being parsed
    pub kind: &'static str,
    /// The offending label
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Declares `as_str`, `Display` and `FromStr` over the snake_case labels
/// shared by serde and the record store.
macro_rules! labelled_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            /// Stable snake_case label.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            /// Every variant in declaration order.
            pub fn all() -> &'static [Self] {
                &[$(Self::$variant,)+]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    other => Err(UnknownVariant::new($kind, other)),
                }
            }
        }
    };
}

/// Position of a venture in the investment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum VentureStage {
    /// Submitted through the intake form, not yet reviewed
    #[default]
    Intake,
    Screening,
    Assessment,
    DueDiligence,
    InvestmentReady,
    /// Funded and tracked as part of the portfolio
    Portfolio,
    Exited,
}

labelled_enum!(VentureStage, "venture stage", {
    Intake => "intake",
    Screening => "screening",
    Assessment => "assessment",
    DueDiligence => "due_diligence",
    InvestmentReady => "investment_ready",
    Portfolio => "portfolio",
    Exited => "exited",
});

/// GEDSI reporting category of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum GedsiCategory {
    Gender,
    Disability,
    SocialInclusion,
    CrossCutting,
}

labelled_enum!(GedsiCategory, "GEDSI category", {
    Gender => "gender",
    Disability => "disability",
    SocialInclusion => "social_inclusion",
    CrossCutting => "cross_cutting",
});

/// Progress status of a GEDSI metric.
///
/// Transitions are not enforced; any status may overwrite any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Verified,
}

labelled_enum!(MetricStatus, "metric status", {
    NotStarted => "not_started",
    InProgress => "in_progress",
    Completed => "completed",
    Verified => "verified",
});

impl MetricStatus {
    /// Completed and Verified both count toward compliance.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Completed | Self::Verified)
    }

    /// Human readable label, as shown on the dashboard.
    pub fn display_label(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Verified => "Verified",
        }
    }
}

/// Kind of entry in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    VentureCreated,
    VentureUpdated,
    MetricCreated,
    MetricUpdated,
    MetricDeleted,
    IntakeSubmitted,
    AssessmentGenerated,
    Note,
}

labelled_enum!(ActivityType, "activity type", {
    VentureCreated => "venture_created",
    VentureUpdated => "venture_updated",
    MetricCreated => "metric_created",
    MetricUpdated => "metric_updated",
    MetricDeleted => "metric_deleted",
    IntakeSubmitted => "intake_submitted",
    AssessmentGenerated => "assessment_generated",
    Note => "note",
});

/// Outcome of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
    Running,
}

labelled_enum!(RunStatus, "run status", {
    Succeeded => "succeeded",
    Failed => "failed",
    Running => "running",
});

/// Share of finished metrics within one GEDSI category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct CategoryCompletion {
    pub category: GedsiCategory,
    pub total: u64,
    pub completed: u64,
    /// Rounded percentage, 0 when `total` is 0
    pub completion_rate: u32,
}

/// Cached values derived from a venture's metrics and activities.
///
/// The recalculation timestamp is kept on the venture, outside this struct,
/// so two recalculations over the same inputs compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct DerivedFields {
    pub gedsi_score: u32,
    pub social_impact_score: u32,
    pub gedsi_compliance_rate: u32,
    pub total_beneficiaries: u64,
    pub jobs_created: u64,
    pub women_empowered: u64,
    pub disability_inclusive: u64,
    pub youth_engaged: u64,
    #[serde(default)]
    pub category_completion: Vec<CategoryCompletion>,
}

/// A venture in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Venture {
    pub id: String,
    pub name: String,
    pub sector: String,
    pub stage: VentureStage,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub funding_raised: f64,
    #[serde(default)]
    pub team_size: u32,
    /// Founder-type tags such as `women-led` or `rural-focus`
    #[serde(default)]
    pub founder_types: Vec<String>,
    /// Free-text description of the venture's inclusion focus
    #[serde(default)]
    pub inclusion_focus: String,
    #[serde(default)]
    pub operational_readiness: BTreeMap<String, bool>,
    #[serde(default)]
    pub capital_readiness: BTreeMap<String, bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub derived: DerivedFields,
    /// When `derived` was last written; `None` before the first recalculation
    #[serde(default)]
    pub calculated_at: Option<DateTime<Utc>>,
}

impl Venture {
    /// Create a venture at the intake stage with empty readiness data.
    pub fn new(name: impl Into<String>, sector: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            sector: sector.into(),
            stage: VentureStage::default(),
            location: None,
            funding_raised: 0.0,
            team_size: 0,
            founder_types: Vec::new(),
            inclusion_focus: String::new(),
            operational_readiness: BTreeMap::new(),
            capital_readiness: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            derived: DerivedFields::default(),
            calculated_at: None,
        }
    }

    /// Set the pipeline stage.
    pub fn with_stage(mut self, stage: VentureStage) -> Self {
        self.stage = stage;
        self
    }

    /// Set founder-type tags.
    pub fn with_founder_types<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.founder_types = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the inclusion focus text.
    pub fn with_inclusion_focus(mut self, focus: impl Into<String>) -> Self {
        self.inclusion_focus = focus.into();
        self
    }

    /// Set an operational readiness flag.
    pub fn with_operational(mut self, flag: impl Into<String>, value: bool) -> Self {
        self.operational_readiness.insert(flag.into(), value);
        self
    }

    /// Set a capital readiness flag.
    pub fn with_capital(mut self, flag: impl Into<String>, value: bool) -> Self {
        self.capital_readiness.insert(flag.into(), value);
        self
    }

    /// Override the creation timestamp.
    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self.updated_at = at;
        self
    }
}

/// A GEDSI indicator tracked for one venture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct GedsiMetric {
    pub id: String,
    pub venture_id: String,
    /// Indicator code, e.g. `OI.1`
    pub code: String,
    pub name: String,
    pub category: GedsiCategory,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: String,
    pub status: MetricStatus,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GedsiMetric {
    /// Create a not-started metric for a venture.
    pub fn new(
        venture_id: impl Into<String>,
        code: impl Into<String>,
        name: impl Into<String>,
        category: GedsiCategory,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            venture_id: venture_id.into(),
            code: code.into(),
            name: name.into(),
            category,
            target_value: 0.0,
            current_value: 0.0,
            unit: "people".to_string(),
            status: MetricStatus::default(),
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set target and current values.
    pub fn with_values(mut self, target: f64, current: f64) -> Self {
        self.target_value = target;
        self.current_value = current;
        self
    }

    /// Set the unit of measure.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: MetricStatus) -> Self {
        self.status = status;
        self
    }

    /// Set a due date.
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Override the creation timestamp.
    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self.updated_at = at;
        self
    }

    /// Status label used when bucketing metrics into trends.
    ///
    /// An unfinished metric past its due date reports as overdue.
    pub fn trend_label(&self, as_of: DateTime<Utc>) -> &'static str {
        match self.due_date {
            Some(due) if due < as_of && !self.status.is_done() => "Overdue",
            _ => self.status.display_label(),
        }
    }
}

/// Immutable audit-log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub venture_id: Option<String>,
    pub user_id: Option<String>,
    pub activity_type: ActivityType,
    pub title: String,
    pub description: String,
    #[cfg_attr(feature = "typescript", ts(type = "unknown"))]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// Create an activity stamped now.
    pub fn new(activity_type: ActivityType, title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            venture_id: None,
            user_id: None,
            activity_type,
            title: title.into(),
            description: String::new(),
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Attach to a venture.
    pub fn for_venture(mut self, venture_id: impl Into<String>) -> Self {
        self.venture_id = Some(venture_id.into());
        self
    }

    /// Attribute to a user.
    pub fn by_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set structured metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A platform user. Only counted by the analytics layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a user stamped now.
    pub fn new(email: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            name: name.into(),
            role: role.into(),
            created_at: Utc::now(),
        }
    }
}

/// Named automation definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// One execution of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    pub id: String,
    pub workflow_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// A run started at `started_at`; finished unless still running.
    pub fn new(
        workflow_id: impl Into<String>,
        status: RunStatus,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            status,
            started_at,
            finished_at: (status != RunStatus::Running).then_some(started_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_labels_round_trip_through_from_str() {
        for stage in VentureStage::all() {
            assert_eq!(stage.as_str().parse::<VentureStage>().unwrap(), *stage);
        }
        assert_eq!(
            "in_progress".parse::<MetricStatus>().unwrap(),
            MetricStatus::InProgress
        );
        let err = "bogus".parse::<GedsiCategory>().unwrap_err();
        assert_eq!(err.kind, "GEDSI category");
    }

    #[test]
    fn test_serde_labels_match_store_labels() {
        let json = serde_json::to_string(&GedsiCategory::SocialInclusion).unwrap();
        assert_eq!(json, "\"social_inclusion\"");
    }

    #[test]
    fn test_trend_label_overdue() {
        let now = Utc::now();
        let metric = GedsiMetric::new("v1", "OI.1", "Women reached", GedsiCategory::Gender)
            .with_status(MetricStatus::InProgress)
            .with_due_date(now - Duration::days(1));
        assert_eq!(metric.trend_label(now), "Overdue");

        let done = metric.clone().with_status(MetricStatus::Verified);
        assert_eq!(done.trend_label(now), "Verified");
    }

    #[test]
    fn test_running_workflow_has_no_finish_time() {
        let run = WorkflowRun::new("wf", RunStatus::Running, Utc::now());
        assert!(run.finished_at.is_none());
    }
}
