//! Assessment payload shared by the AI path and the fallback path.
//!
//! Consumers see exactly this shape whichever path produced it.

use serde::{Deserialize, Serialize};

use impact_metrics::GedsiCategory;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Upper bound on recommendations returned to callers.
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Upper bound on suggested metrics.
pub const MAX_SUGGESTED_METRICS: usize = 5;

/// Overall risk rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Risks and their mitigations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub risks: Vec<String>,
    pub mitigations: Vec<String>,
}

/// A GEDSI indicator the venture should start tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SuggestedMetric {
    /// Indicator code, e.g. `OI.1`
    pub code: String,
    pub name: String,
    pub category: GedsiCategory,
    pub unit: String,
    pub rationale: String,
}

/// Scoring result for one venture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct VentureAssessment {
    /// Investment readiness, 0-100
    pub readiness_score: u32,
    /// GEDSI alignment, 0-100
    pub gedsi_alignment: u32,
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub suggested_metrics: Vec<SuggestedMetric>,
    pub risk_assessment: RiskAssessment,
    /// Readiness points still available, one decimal
    #[serde(default)]
    pub improvement_potential: f64,
}

/// Why a model response could not be used.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentParseError {
    #[error("No JSON object in response")]
    NoJsonObject,

    #[error("Response does not match assessment shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// The outermost `{ ... }` span of `text`, skipping any prose or code fences
/// around it.
fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

impl VentureAssessment {
    /// Parse and check a model response.
    pub fn parse(text: &str) -> Result<Self, AssessmentParseError> {
        let json = json_object_span(text).ok_or(AssessmentParseError::NoJsonObject)?;
        let mut assessment: Self = serde_json::from_str(json)?;

        if assessment.readiness_score > 100 {
            return Err(AssessmentParseError::OutOfRange {
                field: "readinessScore",
                value: f64::from(assessment.readiness_score),
            });
        }
        if assessment.gedsi_alignment > 100 {
            return Err(AssessmentParseError::OutOfRange {
                field: "gedsiAlignment",
                value: f64::from(assessment.gedsi_alignment),
            });
        }
        let potential = assessment.improvement_potential;
        if !potential.is_finite() || !(0.0..=100.0).contains(&potential) {
            return Err(AssessmentParseError::OutOfRange {
                field: "improvementPotential",
                value: potential,
            });
        }

        assessment.improvement_potential = round1(potential);
        assessment.recommendations.truncate(MAX_RECOMMENDATIONS);
        assessment.suggested_metrics.truncate(MAX_SUGGESTED_METRICS);
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "readinessScore": 62,
        "gedsiAlignment": 80,
        "recommendations": ["a", "b", "c", "d", "e", "f"],
        "suggestedMetrics": [{
            "code": "OI.1",
            "name": "Women reached",
            "category": "gender",
            "unit": "people",
            "rationale": "Women-led venture"
        }],
        "riskAssessment": {
            "level": "low",
            "risks": ["Churn"],
            "mitigations": ["Retention programme"]
        },
        "improvementPotential": 37.56
    }"#;

    #[test]
    fn test_parse_valid_response() {
        let assessment = VentureAssessment::parse(VALID).unwrap();
        assert_eq!(assessment.readiness_score, 62);
        assert_eq!(assessment.recommendations.len(), MAX_RECOMMENDATIONS);
        assert_eq!(assessment.suggested_metrics[0].category, GedsiCategory::Gender);
        assert_eq!(assessment.risk_assessment.level, RiskLevel::Low);
        assert_eq!(assessment.improvement_potential, 37.6);
    }

    #[test]
    fn test_parse_strips_code_fences() {
        let fenced = format!("Here you go:\n```json\n{}\n```", VALID);
        assert!(VentureAssessment::parse(&fenced).is_ok());
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = VentureAssessment::parse("I cannot score this venture.").unwrap_err();
        assert!(matches!(err, AssessmentParseError::NoJsonObject));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let err = VentureAssessment::parse(r#"{"score": 10}"#).unwrap_err();
        assert!(matches!(err, AssessmentParseError::Shape(_)));
    }

    #[test]
    fn test_parse_rejects_out_of_range_scores() {
        let text = VALID.replace("\"gedsiAlignment\": 80", "\"gedsiAlignment\": 140");
        let err = VentureAssessment::parse(&text).unwrap_err();
        assert!(matches!(err, AssessmentParseError::OutOfRange { field: "gedsiAlignment", .. }));
    }
}
