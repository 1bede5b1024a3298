//! Route-facing result envelope.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Tagged result returned to dashboard routes and printed by the CLI.
///
/// Serialized with a `status` discriminator, e.g.
/// `{"status": "not_found", "entity": "venture", "id": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApiOutcome<T> {
    Success { data: T },
    ValidationError { message: String },
    NotFound { entity: String, id: String },
    RateLimited { retry_after_secs: u64 },
    InternalError { message: String },
}

impl<T> ApiOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The payload, if successful.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data } => Some(data),
            _ => None,
        }
    }
}

impl<T> From<Result<T, PipelineError>> for ApiOutcome<T> {
    fn from(result: Result<T, PipelineError>) -> Self {
        match result {
            Ok(data) => Self::Success { data },
            Err(PipelineError::Validation(e)) => Self::ValidationError {
                message: e.to_string(),
            },
            Err(PipelineError::NotFound { entity, id }) => Self::NotFound {
                entity: entity.to_string(),
                id,
            },
            Err(PipelineError::RateLimited { retry_after_secs }) => {
                Self::RateLimited { retry_after_secs }
            }
            Err(e @ (PipelineError::Store(_) | PipelineError::Config(_))) => Self::InternalError {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_outcomes_are_tagged_on_status() {
        let ok: ApiOutcome<u32> = Ok(7).into();
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({"status": "success", "data": 7})
        );

        let missing: ApiOutcome<u32> = Err(PipelineError::not_found("venture", "v-9")).into();
        assert_eq!(
            serde_json::to_value(&missing).unwrap(),
            serde_json::json!({"status": "not_found", "entity": "venture", "id": "v-9"})
        );

        let limited: ApiOutcome<u32> =
            Err(PipelineError::RateLimited { retry_after_secs: 30 }).into();
        assert_eq!(serde_json::to_value(&limited).unwrap()["status"], "rate_limited");
    }

    #[test]
    fn test_validation_and_internal_errors() {
        let invalid: ApiOutcome<()> =
            Err(PipelineError::from(ValidationError::Required { field: "name" })).into();
        assert!(matches!(
            invalid,
            ApiOutcome::ValidationError { ref message } if message.contains("name")
        ));
        assert!(!invalid.is_success());

        let internal: ApiOutcome<()> = Err(PipelineError::Config("bad".into())).into();
        assert!(matches!(internal, ApiOutcome::InternalError { .. }));
        assert!(internal.data().is_none());
    }
}
