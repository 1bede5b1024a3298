//! Pipeline - main entry point for venture pipeline operations.
//!
//! Wires the record store, scorer, activity logger, recalculation trigger
//! and intake limiter together behind one handle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use impact_metrics::trend::weekly_windows;
use impact_metrics::{
    analytics_overview, portfolio_metrics, summarize_monthly, ActivityType, AnalyticsOverview,
    AnalyticsPeriod, AnalyticsSnapshot, DerivedFields, GedsiCategory, GedsiMetric, MetricStatus,
    MonthlyBucket, PortfolioMetrics, TrendPoint, Venture, WeeklyBucket,
};
use venture_scorer::{LlmBackend, OpenAiBackend, ScorerConfig, VentureAssessment, VentureScorer};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::activity::ActivityLogger;
use crate::config::PipelineConfig;
use crate::error::{require_text, NumberInput, PipelineError, ValidationError};
use crate::intake::{IntakeRateLimiter, IntakeReceipt, IntakeSubmission, RateDecision};
use crate::recalculation;
use crate::store::{EntityKind, RecordFilter, RecordStore, SqliteStore};
use crate::trigger::{RecalcHandle, RecalculationTrigger};

/// A stored record plus the recalculation its write started.
#[derive(Debug)]
pub struct Written<T> {
    pub record: T,
    pub recalculation: RecalcHandle,
}

/// Result of recalculating every venture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct RecalcSummary {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// New GEDSI metric as submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricInput {
    pub venture_id: String,
    pub code: String,
    pub name: String,
    pub category: GedsiCategory,
    pub target_value: NumberInput,
    #[serde(default = "zero")]
    pub current_value: NumberInput,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub status: Option<MetricStatus>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

fn zero() -> NumberInput {
    NumberInput::Number(0.0)
}

impl MetricInput {
    pub fn new(
        venture_id: impl Into<String>,
        code: impl Into<String>,
        name: impl Into<String>,
        category: GedsiCategory,
        target_value: impl Into<NumberInput>,
    ) -> Self {
        Self {
            venture_id: venture_id.into(),
            code: code.into(),
            name: name.into(),
            category,
            target_value: target_value.into(),
            current_value: zero(),
            unit: None,
            status: None,
            due_date: None,
        }
    }

    pub fn with_current(mut self, current: impl Into<NumberInput>) -> Self {
        self.current_value = current.into();
        self
    }

    pub fn with_status(mut self, status: MetricStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn into_metric(self) -> Result<GedsiMetric, ValidationError> {
        let venture_id = require_text("ventureId", &self.venture_id)?;
        let code = require_text("code", &self.code)?;
        let name = require_text("name", &self.name)?;
        let unit = match &self.unit {
            Some(unit) => require_text("unit", unit)?,
            None => "people".to_string(),
        };

        let mut metric = GedsiMetric::new(venture_id, code, name, self.category)
            .with_values(
                self.target_value.resolve("targetValue")?,
                self.current_value.resolve("currentValue")?,
            )
            .with_unit(unit)
            .with_status(self.status.unwrap_or_default());
        metric.due_date = self.due_date;
        Ok(metric)
    }
}

/// Partial update of a GEDSI metric. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target_value: Option<NumberInput>,
    #[serde(default)]
    pub current_value: Option<NumberInput>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub status: Option<MetricStatus>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl MetricUpdate {
    fn apply(self, metric: &mut GedsiMetric) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            metric.name = require_text("name", name)?;
        }
        if let Some(target) = &self.target_value {
            metric.target_value = target.resolve("targetValue")?;
        }
        if let Some(current) = &self.current_value {
            metric.current_value = current.resolve("currentValue")?;
        }
        if let Some(unit) = &self.unit {
            metric.unit = require_text("unit", unit)?;
        }
        if let Some(status) = self.status {
            metric.status = status;
        }
        if let Some(due) = self.due_date {
            metric.due_date = Some(due);
        }
        metric.updated_at = Utc::now();
        Ok(())
    }
}

/// Wait for an activity insert so the recalculation that follows counts it.
/// A failed insert has already been logged by the logger.
async fn settle(task: JoinHandle<()>) {
    if let Err(e) = task.await {
        warn!(error = %e, "Activity task did not complete");
    }
}

/// Main entry point for venture pipeline operations.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn RecordStore>,
    scorer: VentureScorer,
    activities: ActivityLogger,
    trigger: RecalculationTrigger,
    limiter: Arc<IntakeRateLimiter>,
}

impl Pipeline {
    /// Create a pipeline over `store` with default intake limits.
    pub fn new(store: Arc<dyn RecordStore>, scorer: VentureScorer) -> Self {
        let intake = crate::config::IntakeConfig::default();
        Self {
            activities: ActivityLogger::new(Arc::clone(&store)),
            trigger: RecalculationTrigger::new(Arc::clone(&store)),
            limiter: Arc::new(IntakeRateLimiter::new(
                intake.window_secs,
                intake.max_requests,
                intake.max_clients,
            )),
            store,
            scorer,
        }
    }

    /// Replace the intake limiter.
    pub fn with_rate_limiter(mut self, limiter: IntakeRateLimiter) -> Self {
        self.limiter = Arc::new(limiter);
        self
    }

    /// Open the store and backend described by `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let store: Arc<dyn RecordStore> = if config.database.path == ":memory:" {
            Arc::new(SqliteStore::open_in_memory()?)
        } else {
            Arc::new(SqliteStore::open(&config.database.path)?)
        };

        let scoring = &config.scoring;
        let scorer = if scoring.enabled {
            let backend = OpenAiBackend::new(
                scoring.base_url.clone(),
                scoring.model.clone(),
                scoring.api_key.clone(),
                Duration::from_millis(scoring.timeout_ms),
            )
            .map_err(|e| PipelineError::Config(e.to_string()))?;
            info!(model = %scoring.model, base_url = %scoring.base_url, "Model scoring enabled");
            let backend: Arc<dyn LlmBackend> = Arc::new(backend);
            VentureScorer::new(backend)
        } else {
            info!("Model scoring disabled, using rule-based assessments");
            VentureScorer::fallback_only()
        };
        let scorer = scorer.with_config(ScorerConfig {
            max_tokens: scoring.max_tokens,
            temperature: scoring.temperature,
        });

        let intake = &config.intake;
        Ok(Self::new(store, scorer).with_rate_limiter(IntakeRateLimiter::new(
            intake.window_secs,
            intake.max_requests,
            intake.max_clients,
        )))
    }

    /// The underlying record store.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// The recalculation trigger, for its counters.
    pub fn trigger(&self) -> &RecalculationTrigger {
        &self.trigger
    }

    async fn require_venture(&self, id: &str) -> Result<Venture, PipelineError> {
        self.store
            .venture(id)
            .await?
            .ok_or_else(|| PipelineError::not_found("venture", id))
    }

    async fn require_metric(&self, id: &str) -> Result<GedsiMetric, PipelineError> {
        self.store
            .metric(id)
            .await?
            .ok_or_else(|| PipelineError::not_found("metric", id))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Portfolio totals and averages over every venture's cached fields.
    pub async fn portfolio_metrics(&self) -> Result<PortfolioMetrics, PipelineError> {
        let ventures = self.store.ventures(&RecordFilter::all()).await?;
        debug!(ventures = ventures.len(), "Computing portfolio metrics");
        Ok(portfolio_metrics(&ventures))
    }

    /// Assess a venture; never fails once the venture is found.
    pub async fn score_venture(&self, id: &str) -> Result<VentureAssessment, PipelineError> {
        let venture = self.require_venture(id).await?;
        Ok(self.scorer.assess(&venture).await)
    }

    /// Analytics overview for the window ending now.
    pub async fn analytics_overview(
        &self,
        period: AnalyticsPeriod,
    ) -> Result<AnalyticsOverview, PipelineError> {
        self.analytics_overview_at(period, Utc::now()).await
    }

    /// Analytics overview for the window ending at `now`.
    pub async fn analytics_overview_at(
        &self,
        period: AnalyticsPeriod,
        now: DateTime<Utc>,
    ) -> Result<AnalyticsOverview, PipelineError> {
        let all = RecordFilter::all();
        let in_period = RecordFilter::between(period.start_date(now), now);

        let snapshot = AnalyticsSnapshot {
            period,
            now,
            total_ventures: self.store.count(EntityKind::Ventures, &all).await?,
            ventures_in_period: self.store.count(EntityKind::Ventures, &in_period).await?,
            total_users: self.store.count(EntityKind::Users, &all).await?,
            users_in_period: self.store.count(EntityKind::Users, &in_period).await?,
            total_activities: self.store.count(EntityKind::Activities, &all).await?,
            ventures: self.store.ventures(&all).await?,
            metrics: self.store.metrics(&all).await?,
            runs_in_period: self.store.workflow_runs(&in_period).await?,
            weekly_trend: self.weekly_trend(now).await?,
        };

        debug!(period = %period, "Computing analytics overview");
        Ok(analytics_overview(snapshot))
    }

    /// Ventures created in each of the six trailing weeks.
    async fn weekly_trend(&self, now: DateTime<Utc>) -> Result<Vec<WeeklyBucket>, PipelineError> {
        let mut windows = weekly_windows(now);
        for window in &mut windows {
            let filter = RecordFilter::between(window.start, window.end);
            window.ventures = self.store.count(EntityKind::Ventures, &filter).await?;
        }
        Ok(windows)
    }

    /// Monthly metric status trend, for one venture or the whole portfolio.
    pub async fn metric_trends(
        &self,
        venture_id: Option<&str>,
    ) -> Result<Vec<MonthlyBucket>, PipelineError> {
        let filter = match venture_id {
            Some(id) => {
                self.require_venture(id).await?;
                RecordFilter::for_venture(id)
            }
            None => RecordFilter::all(),
        };

        let now = Utc::now();
        let metrics = self.store.metrics(&filter).await?;
        Ok(summarize_monthly(
            metrics.iter().map(|m| TrendPoint::from_metric(m, now)),
        ))
    }

    // =========================================================================
    // Recalculation
    // =========================================================================

    /// Recalculate one venture and wait for the result.
    pub async fn recalculate_venture(&self, id: &str) -> Result<DerivedFields, PipelineError> {
        recalculation::recalculate_venture(self.store.as_ref(), id).await
    }

    /// Recalculate one venture in the background.
    pub fn trigger_recalculation(&self, id: &str) -> RecalcHandle {
        self.trigger.trigger(id)
    }

    /// Recalculate every venture. A failing venture is counted and logged;
    /// the sweep always finishes.
    pub async fn recalculate_all(&self) -> Result<RecalcSummary, PipelineError> {
        let ventures = self.store.ventures(&RecordFilter::all()).await?;
        info!(ventures = ventures.len(), "Recalculating all ventures");

        let results = join_all(ventures.iter().map(|v| self.recalculate_venture(&v.id))).await;

        let mut summary = RecalcSummary {
            total: ventures.len() as u64,
            ..Default::default()
        };
        for (venture, result) in ventures.iter().zip(results) {
            match result {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(venture_id = %venture.id, error = %e, "Recalculation failed");
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Recalculation sweep finished"
        );
        Ok(summary)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store a new venture.
    pub async fn create_venture(
        &self,
        venture: Venture,
        user_id: Option<&str>,
    ) -> Result<Written<Venture>, PipelineError> {
        let mut venture = venture;
        venture.name = require_text("name", &venture.name)?;
        venture.sector = require_text("sector", &venture.sector)?;

        self.store.insert_venture(&venture).await?;
        info!(venture_id = %venture.id, name = %venture.name, "Venture created");

        settle(self.activities.record(
            Some(&venture.id),
            user_id,
            ActivityType::VentureCreated,
            format!("Venture created: {}", venture.name),
            format!("{} venture added at the {} stage", venture.sector, venture.stage),
            serde_json::json!({ "stage": venture.stage }),
        ))
        .await;
        let recalculation = self.trigger.trigger(&venture.id);

        Ok(Written {
            record: venture,
            recalculation,
        })
    }

    /// Store a new GEDSI metric for an existing venture.
    pub async fn create_metric(
        &self,
        input: MetricInput,
        user_id: Option<&str>,
    ) -> Result<Written<GedsiMetric>, PipelineError> {
        let metric = input.into_metric()?;
        self.require_venture(&metric.venture_id).await?;

        self.store.insert_metric(&metric).await?;
        info!(
            venture_id = %metric.venture_id,
            metric_id = %metric.id,
            code = %metric.code,
            "Metric created"
        );

        settle(self.activities.record(
            Some(&metric.venture_id),
            user_id,
            ActivityType::MetricCreated,
            format!("Metric added: {}", metric.code),
            metric.name.clone(),
            serde_json::json!({ "metricId": metric.id, "category": metric.category }),
        ))
        .await;
        let recalculation = self.trigger.trigger(&metric.venture_id);

        Ok(Written {
            record: metric,
            recalculation,
        })
    }

    /// Apply a partial update to a metric.
    pub async fn update_metric(
        &self,
        id: &str,
        update: MetricUpdate,
        user_id: Option<&str>,
    ) -> Result<Written<GedsiMetric>, PipelineError> {
        let mut metric = self.require_metric(id).await?;
        let previous_status = metric.status;
        update.apply(&mut metric)?;

        self.store.update_metric(&metric).await?;
        info!(venture_id = %metric.venture_id, metric_id = %metric.id, "Metric updated");

        settle(self.activities.record(
            Some(&metric.venture_id),
            user_id,
            ActivityType::MetricUpdated,
            format!("Metric updated: {}", metric.code),
            format!("{} -> {}", previous_status.display_label(), metric.status.display_label()),
            serde_json::json!({
                "metricId": metric.id,
                "currentValue": metric.current_value,
                "status": metric.status,
            }),
        ))
        .await;
        let recalculation = self.trigger.trigger(&metric.venture_id);

        Ok(Written {
            record: metric,
            recalculation,
        })
    }

    /// Delete a metric, returning what was removed.
    pub async fn delete_metric(
        &self,
        id: &str,
        user_id: Option<&str>,
    ) -> Result<Written<GedsiMetric>, PipelineError> {
        let metric = self.require_metric(id).await?;

        self.store.delete_metric(id).await?;
        info!(venture_id = %metric.venture_id, metric_id = %metric.id, "Metric deleted");

        settle(self.activities.record(
            Some(&metric.venture_id),
            user_id,
            ActivityType::MetricDeleted,
            format!("Metric removed: {}", metric.code),
            metric.name.clone(),
            serde_json::json!({ "metricId": metric.id }),
        ))
        .await;
        let recalculation = self.trigger.trigger(&metric.venture_id);

        Ok(Written {
            record: metric,
            recalculation,
        })
    }

    // =========================================================================
    // Intake
    // =========================================================================

    /// Accept a public intake submission from `client_addr`.
    ///
    /// Rate limit, validate, create the venture, then assess it. The
    /// assessment never fails: a broken backend yields the rule-based one.
    pub async fn submit_intake(
        &self,
        client_addr: &str,
        submission: IntakeSubmission,
    ) -> Result<IntakeReceipt, PipelineError> {
        if let RateDecision::Limited { retry_after_secs } = self.limiter.check(client_addr) {
            warn!(client = %client_addr, retry_after_secs, "Intake submission rate limited");
            return Err(PipelineError::RateLimited { retry_after_secs });
        }

        let submitted_by = submission.submitted_by.clone();
        let venture = submission.into_venture()?;

        self.store.insert_venture(&venture).await?;
        info!(
            venture_id = %venture.id,
            name = %venture.name,
            client = %client_addr,
            "Intake submission accepted"
        );

        settle(self.activities.record(
            Some(&venture.id),
            submitted_by.as_deref(),
            ActivityType::IntakeSubmitted,
            format!("Intake submitted: {}", venture.name),
            format!("{} venture submitted through the intake form", venture.sector),
            serde_json::json!({ "founderTypes": venture.founder_types }),
        ))
        .await;

        let (assessment, source) = self.scorer.assess_with_source(&venture).await;
        settle(self.activities.record(
            Some(&venture.id),
            submitted_by.as_deref(),
            ActivityType::AssessmentGenerated,
            format!("Assessment generated: {}", venture.name),
            format!(
                "Readiness {} / GEDSI alignment {}",
                assessment.readiness_score, assessment.gedsi_alignment
            ),
            serde_json::json!({
                "readinessScore": assessment.readiness_score,
                "gedsiAlignment": assessment.gedsi_alignment,
                "source": format!("{:?}", source).to_lowercase(),
            }),
        ))
        .await;
        // Detached: the receipt does not wait for derived fields.
        drop(self.trigger.trigger(&venture.id));

        Ok(IntakeReceipt {
            venture,
            assessment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::FounderTypesInput;

    fn pipeline() -> Pipeline {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        Pipeline::new(store, VentureScorer::fallback_only())
    }

    #[tokio::test]
    async fn test_empty_portfolio() {
        let metrics = pipeline().portfolio_metrics().await.unwrap();
        assert_eq!(metrics.total_ventures, 0);
        assert_eq!(metrics.average_gedsi_score, 0);
        assert_eq!(metrics.message.as_deref(), Some("No ventures found"));
    }

    #[tokio::test]
    async fn test_metric_input_validation() {
        let pipeline = pipeline();
        let venture = pipeline
            .create_venture(Venture::new("Acme", "Retail"), None)
            .await
            .unwrap()
            .record;

        let input = MetricInput::new(
            &venture.id,
            "OI.1",
            "Women reached",
            GedsiCategory::Gender,
            NumberInput::Text("many".into()),
        );
        let err = pipeline.create_metric(input, None).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::NotNumeric { .. })
        ));

        let orphan =
            MetricInput::new("missing", "OI.1", "Women reached", GedsiCategory::Gender, 10.0);
        let err = pipeline.create_metric(orphan, None).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { entity: "venture", .. }));
    }

    #[tokio::test]
    async fn test_blank_venture_name_rejected() {
        let err = pipeline()
            .create_venture(Venture::new("  ", "Retail"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::Required { field: "name" })
        ));
    }

    #[tokio::test]
    async fn test_intake_rate_limit() {
        let pipeline = pipeline().with_rate_limiter(IntakeRateLimiter::new(3600, 1, 10));

        let mut submission = IntakeSubmission::new("AgriLink", "Agriculture");
        submission.founder_types = FounderTypesInput::Text("women-led".into());
        pipeline.submit_intake("10.0.0.1", submission.clone()).await.unwrap();

        let err = pipeline.submit_intake("10.0.0.1", submission).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::RateLimited { retry_after_secs } if retry_after_secs > 0
        ));
    }

    #[tokio::test]
    async fn test_score_unknown_venture() {
        let err = pipeline().score_venture("missing").await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }
}
