//! Venture Scorer - readiness and GEDSI alignment assessment
//!
//! Scores a venture's investment readiness and GEDSI alignment:
//! - Trait-based generative backends (OpenAI-compatible, mock)
//! - Strict parsing of model output into a fixed assessment shape
//! - Deterministic rule-based fallback driven by signal rule tables
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             VentureScorer               │
//! │   (one model call, then fallback)       │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┴───────────┐
//!      ▼                       ▼
//! ┌─────────────┐       ┌─────────────┐
//! │ LlmBackend  │       │  fallback   │
//! │ (OpenAI/    │       │  + signal   │
//! │  Mock)      │       │  rules      │
//! └─────────────┘       └─────────────┘
//! ```

pub mod assessment;
pub mod backend;
pub mod fallback;
pub mod prompt;
pub mod service;
pub mod signals;

// Re-export main types for convenience
pub use assessment::{
    AssessmentParseError, RiskAssessment, RiskLevel, SuggestedMetric, VentureAssessment,
};
pub use backend::traits::{CompletionRequest, CompletionResponse, LlmBackend, LlmError};
pub use backend::{MockBackend, OpenAiBackend};
pub use service::{AssessmentSource, ScorerConfig, VentureScorer};
pub use signals::{Signal, SignalProfile};
