//! Public intake form submissions.
//!
//! A submission becomes a venture at the intake stage. The form is loose:
//! numbers may arrive as strings and founder types as a JSON array, a JSON
//! encoded string or a comma separated list.

pub mod rate_limit;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use impact_metrics::{Venture, VentureStage};
use venture_scorer::VentureAssessment;

use crate::error::{require_text, NumberInput, ValidationError};

pub use rate_limit::{IntakeRateLimiter, RateDecision};

/// Founder types as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FounderTypesInput {
    List(Vec<String>),
    Text(String),
}

impl Default for FounderTypesInput {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl FounderTypesInput {
    /// Non-empty trimmed tags.
    pub fn parse(&self) -> Result<Vec<String>, ValidationError> {
        let raw: Vec<String> = match self {
            Self::List(tags) => tags.clone(),
            Self::Text(text) if text.trim_start().starts_with('[') => {
                serde_json::from_str(text).map_err(|e| ValidationError::Malformed {
                    field: "founderTypes",
                    reason: e.to_string(),
                })?
            }
            Self::Text(text) => text.split(',').map(str::to_string).collect(),
        };

        Ok(raw
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect())
    }
}

/// Intake form payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeSubmission {
    pub name: String,
    pub sector: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub funding_raised: Option<NumberInput>,
    #[serde(default)]
    pub team_size: Option<u32>,
    #[serde(default)]
    pub founder_types: FounderTypesInput,
    #[serde(default)]
    pub inclusion_focus: String,
    #[serde(default)]
    pub operational_readiness: BTreeMap<String, bool>,
    #[serde(default)]
    pub capital_readiness: BTreeMap<String, bool>,
    /// User filing the form on the venture's behalf, if signed in
    #[serde(default)]
    pub submitted_by: Option<String>,
}

impl IntakeSubmission {
    pub fn new(name: impl Into<String>, sector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sector: sector.into(),
            ..Default::default()
        }
    }

    /// Validate and build the venture.
    pub fn into_venture(self) -> Result<Venture, ValidationError> {
        let name = require_text("name", &self.name)?;
        let sector = require_text("sector", &self.sector)?;
        let funding_raised = match &self.funding_raised {
            Some(input) => input.resolve("fundingRaised")?,
            None => 0.0,
        };

        let mut venture = Venture::new(name, sector)
            .with_stage(VentureStage::Intake)
            .with_founder_types(self.founder_types.parse()?)
            .with_inclusion_focus(self.inclusion_focus.trim());
        venture.location = self
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        venture.funding_raised = funding_raised;
        venture.team_size = self.team_size.unwrap_or(0);
        venture.operational_readiness = self.operational_readiness;
        venture.capital_readiness = self.capital_readiness;

        Ok(venture)
    }
}

/// What the submitter gets back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeReceipt {
    pub venture: Venture,
    pub assessment: VentureAssessment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_founder_types_formats() {
        let list = FounderTypesInput::List(vec!["women-led".into(), " ".into()]);
        assert_eq!(list.parse().unwrap(), vec!["women-led"]);

        let json = FounderTypesInput::Text(r#"["women-led", "youth-led"]"#.to_string());
        assert_eq!(json.parse().unwrap(), vec!["women-led", "youth-led"]);

        let csv = FounderTypesInput::Text("women-led, rural-focus,".to_string());
        assert_eq!(csv.parse().unwrap(), vec!["women-led", "rural-focus"]);

        let broken = FounderTypesInput::Text("[\"women-led\"".to_string());
        assert!(matches!(broken.parse(), Err(ValidationError::Malformed { .. })));
    }

    #[test]
    fn test_submission_from_form_json() {
        let submission: IntakeSubmission = serde_json::from_value(serde_json::json!({
            "name": " AgriLink ",
            "sector": "Agriculture",
            "fundingRaised": "25000",
            "teamSize": 6,
            "founderTypes": "women-led,rural-focus",
            "inclusionFocus": "rural women farmers",
            "operationalReadiness": {"businessPlan": true}
        }))
        .unwrap();

        let venture = submission.into_venture().unwrap();
        assert_eq!(venture.name, "AgriLink");
        assert_eq!(venture.stage, VentureStage::Intake);
        assert_eq!(venture.funding_raised, 25_000.0);
        assert_eq!(venture.team_size, 6);
        assert_eq!(venture.founder_types, vec!["women-led", "rural-focus"]);
        assert_eq!(venture.operational_readiness.len(), 1);
    }

    #[test]
    fn test_submission_validation() {
        assert_eq!(
            IntakeSubmission::new("  ", "Retail").into_venture().unwrap_err(),
            ValidationError::Required { field: "name" }
        );

        let mut bad_funding = IntakeSubmission::new("Acme", "Retail");
        bad_funding.funding_raised = Some(NumberInput::Text("a lot".to_string()));
        assert!(matches!(
            bad_funding.into_venture(),
            Err(ValidationError::NotNumeric { field: "fundingRaised", .. })
        ));
    }
}
