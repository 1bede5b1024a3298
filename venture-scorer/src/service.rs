//! VentureScorer - entry point for venture assessment.
//!
//! Tries the generative backend once and falls back to the rule-based
//! scorer on any failure. Callers always get an assessment.

use std::sync::Arc;
use tracing::{debug, info, warn};

use impact_metrics::Venture;

use crate::assessment::VentureAssessment;
use crate::backend::traits::{CompletionRequest, LlmBackend};
use crate::fallback;
use crate::prompt::PromptAssembler;

/// Generation settings for scoring calls.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.2,
        }
    }
}

/// Which path produced an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentSource {
    Model,
    Fallback,
}

/// Venture scorer with an optional generative backend.
#[derive(Clone)]
pub struct VentureScorer {
    backend: Option<Arc<dyn LlmBackend>>,
    config: ScorerConfig,
}

impl VentureScorer {
    /// Scorer that calls `backend` first.
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend: Some(backend),
            config: ScorerConfig::default(),
        }
    }

    /// Scorer that only uses the rule-based path.
    pub fn fallback_only() -> Self {
        Self {
            backend: None,
            config: ScorerConfig::default(),
        }
    }

    /// Create with configuration.
    pub fn with_config(mut self, config: ScorerConfig) -> Self {
        self.config = config;
        self
    }

    /// Identifier of the configured backend, if any.
    pub fn backend_id(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.id())
    }

    /// Assess a venture.
    pub async fn assess(&self, venture: &Venture) -> VentureAssessment {
        self.assess_with_source(venture).await.0
    }

    /// Assess a venture and report which path answered.
    pub async fn assess_with_source(
        &self,
        venture: &Venture,
    ) -> (VentureAssessment, AssessmentSource) {
        let Some(backend) = &self.backend else {
            debug!(venture_id = %venture.id, "No scoring backend configured, using fallback");
            return (fallback::assess(venture), AssessmentSource::Fallback);
        };

        let request = CompletionRequest::user(PromptAssembler::build_assessment_prompt(venture))
            .with_system(PromptAssembler::build_system_prompt())
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature)
            .with_json_output();

        let response = match backend.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    venture_id = %venture.id,
                    backend = backend.id(),
                    error = %e,
                    "Scoring backend failed, using fallback"
                );
                return (fallback::assess(venture), AssessmentSource::Fallback);
            }
        };

        match VentureAssessment::parse(&response.content) {
            Ok(assessment) => {
                info!(
                    venture_id = %venture.id,
                    backend = backend.id(),
                    tokens = response.usage.total(),
                    readiness = assessment.readiness_score,
                    "Venture assessed by model"
                );
                (assessment, AssessmentSource::Model)
            }
            Err(e) => {
                warn!(
                    venture_id = %venture.id,
                    backend = backend.id(),
                    error = %e,
                    "Unusable scoring response, using fallback"
                );
                (fallback::assess(venture), AssessmentSource::Fallback)
            }
        }
    }
}
