//! Error types for impact-pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

/// Input rejected before anything was written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be a number, got {value:?}")]
    NotNumeric { field: &'static str, value: String },

    #[error("{field} must be finite")]
    NotFinite { field: &'static str },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} is malformed: {reason}")]
    Malformed { field: &'static str, reason: String },
}

/// Errors surfaced by pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Too many submissions, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Store(other),
        }
    }
}

/// A numeric form field: either a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    /// Resolve to a finite, non-negative value.
    pub fn resolve(&self, field: &'static str) -> Result<f64, ValidationError> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::Required { field });
                }
                trimmed.parse::<f64>().map_err(|_| ValidationError::NotNumeric {
                    field,
                    value: raw.clone(),
                })?
            }
        };

        if !value.is_finite() {
            return Err(ValidationError::NotFinite { field });
        }
        if value < 0.0 {
            return Err(ValidationError::Negative { field, value });
        }
        Ok(value)
    }
}

impl From<f64> for NumberInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Trimmed copy of `value`, or `Required` if nothing is left.
pub fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required { field })
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_input_accepts_numbers_and_numeric_strings() {
        let from_json: NumberInput = serde_json::from_value(serde_json::json!(120)).unwrap();
        assert_eq!(from_json.resolve("targetValue").unwrap(), 120.0);

        let from_text: NumberInput = serde_json::from_value(serde_json::json!(" 42.5 ")).unwrap();
        assert_eq!(from_text.resolve("targetValue").unwrap(), 42.5);
    }

    #[test]
    fn test_number_input_rejects_bad_values() {
        let text = NumberInput::Text("lots".to_string());
        assert!(matches!(
            text.resolve("currentValue"),
            Err(ValidationError::NotNumeric { .. })
        ));

        let nan = NumberInput::Text("NaN".to_string());
        assert_eq!(
            nan.resolve("currentValue"),
            Err(ValidationError::NotFinite { field: "currentValue" })
        );

        let negative = NumberInput::Number(-3.0);
        assert!(matches!(
            negative.resolve("fundingRaised"),
            Err(ValidationError::Negative { .. })
        ));

        let blank = NumberInput::Text("  ".to_string());
        assert_eq!(
            blank.resolve("fundingRaised"),
            Err(ValidationError::Required { field: "fundingRaised" })
        );
    }

    #[test]
    fn test_store_not_found_becomes_pipeline_not_found() {
        let err: PipelineError = StoreError::not_found("venture", "v-1").into();
        assert!(matches!(err, PipelineError::NotFound { entity: "venture", .. }));
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("name", "  Acme ").unwrap(), "Acme");
        assert!(require_text("name", " \t").is_err());
    }
}
