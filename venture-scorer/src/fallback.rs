//! Rule-based venture scoring.
//!
//! Used when the generative backend fails or returns something unusable.
//! Every function here is deterministic in the venture it is given.

use std::collections::BTreeMap;

use impact_metrics::{GedsiCategory, Venture};

use crate::assessment::{
    round1, RiskAssessment, RiskLevel, SuggestedMetric, VentureAssessment, MAX_RECOMMENDATIONS,
};
use crate::signals::{Signal, SignalProfile};

/// Alignment score before any bonus.
pub const BASE_ALIGNMENT: u32 = 50;

/// Alignment ceiling.
pub const MAX_ALIGNMENT: u32 = 100;

/// Which readiness object a flag lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadinessArea {
    Operational,
    Capital,
}

/// Readiness flags that produce a recommendation when missing, in order.
const READINESS_GAPS: &[(ReadinessArea, &str, &str)] = &[
    (
        ReadinessArea::Operational,
        "businessPlan",
        "Develop a business plan that sets out the venture's model, market and milestones",
    ),
    (
        ReadinessArea::Operational,
        "financialProjections",
        "Prepare three-year financial projections with clear revenue and cost assumptions",
    ),
    (
        ReadinessArea::Capital,
        "pitchDeck",
        "Create an investor pitch deck covering problem, solution, traction and the ask",
    ),
    (
        ReadinessArea::Capital,
        "financialStatements",
        "Compile up-to-date financial statements (income statement, balance sheet, cash flow)",
    ),
];

/// Sector-specific additions, matched case-insensitively on the sector name.
const SECTOR_RECOMMENDATIONS: &[(&str, &[&str])] = &[
    (
        "agriculture",
        &[
            "Map smallholder supply chains and document climate-resilience practices",
            "Explore cooperative offtake agreements to stabilise farmer income",
        ],
    ),
    (
        "fintech",
        &[
            "Review licensing and regulatory obligations for financial services",
            "Strengthen data protection and consumer safeguards for customer funds",
        ],
    ),
];

/// Share of true flags in one readiness object, 0 for an empty object.
fn area_score(flags: &BTreeMap<String, bool>) -> f64 {
    if flags.is_empty() {
        return 0.0;
    }
    let truthy = flags.values().filter(|v| **v).count();
    truthy as f64 / flags.len() as f64 * 100.0
}

/// Unrounded mean of the operational and capital readiness percentages.
fn raw_readiness(venture: &Venture) -> f64 {
    (area_score(&venture.operational_readiness) + area_score(&venture.capital_readiness)) / 2.0
}

/// Readiness score in [0, 100].
pub fn readiness_score(venture: &Venture) -> u32 {
    raw_readiness(venture).round() as u32
}

/// Readiness points left on the table, one decimal.
pub fn improvement_potential(venture: &Venture) -> f64 {
    round1(100.0 - raw_readiness(venture))
}

/// GEDSI alignment in [50, 100].
pub fn gedsi_alignment(venture: &Venture) -> u32 {
    alignment_from(&SignalProfile::detect(venture))
}

fn alignment_from(profile: &SignalProfile) -> u32 {
    (BASE_ALIGNMENT + profile.total_bonus()).min(MAX_ALIGNMENT)
}

/// Gap recommendations first, then sector recommendations; at most five.
pub fn recommendations(venture: &Venture) -> Vec<String> {
    let mut out: Vec<String> = READINESS_GAPS
        .iter()
        .filter(|(area, flag, _)| {
            let flags = match area {
                ReadinessArea::Operational => &venture.operational_readiness,
                ReadinessArea::Capital => &venture.capital_readiness,
            };
            !flags.get(*flag).copied().unwrap_or(false)
        })
        .map(|(_, _, text)| text.to_string())
        .collect();

    let sector = venture.sector.to_lowercase();
    for (name, extra) in SECTOR_RECOMMENDATIONS {
        if sector.contains(name) {
            out.extend(extra.iter().map(|s| s.to_string()));
        }
    }

    out.truncate(MAX_RECOMMENDATIONS);
    out
}

/// The static risk profile used whenever the model path is unavailable.
pub fn default_risk_assessment() -> RiskAssessment {
    RiskAssessment {
        level: RiskLevel::Medium,
        risks: vec![
            "Market adoption may be slower than projected".to_string(),
            "Limited runway to reach the next funding milestone".to_string(),
            "Operational capacity may constrain scaling".to_string(),
        ],
        mitigations: vec![
            "Validate demand with pilot customers before scaling".to_string(),
            "Diversify funding across grants, debt and equity".to_string(),
            "Invest in team capacity and documented processes".to_string(),
        ],
    }
}

fn suggestion(code: &str, name: &str, category: GedsiCategory, rationale: &str) -> SuggestedMetric {
    SuggestedMetric {
        code: code.to_string(),
        name: name.to_string(),
        category,
        unit: "people".to_string(),
        rationale: rationale.to_string(),
    }
}

/// Indicator suggestions gated by detected signals.
pub fn suggested_metrics(venture: &Venture) -> Vec<SuggestedMetric> {
    suggestions_from(&SignalProfile::detect(venture))
}

fn suggestions_from(profile: &SignalProfile) -> Vec<SuggestedMetric> {
    let mut out = Vec::new();

    if profile.has(Signal::Gender) {
        out.push(suggestion(
            "OI.1",
            "Women benefiting from the venture's products or services",
            GedsiCategory::Gender,
            "Women-led or gender-focused venture",
        ));
    }
    if profile.has(Signal::Disability) {
        out.push(suggestion(
            "OI.2",
            "Persons with disabilities reached",
            GedsiCategory::Disability,
            "Disability-inclusive focus",
        ));
    }
    if profile.has(Signal::Rural) {
        out.push(suggestion(
            "OI.3",
            "Rural households reached",
            GedsiCategory::SocialInclusion,
            "Rural or community focus",
        ));
    }
    if profile.has(Signal::Youth) {
        out.push(suggestion(
            "OI.4",
            "Young people engaged or employed",
            GedsiCategory::SocialInclusion,
            "Youth-led or youth-focused venture",
        ));
    }
    if profile.has(Signal::FinancialInclusion) {
        out.push(suggestion(
            "OI.6",
            "People with improved access to financial services",
            GedsiCategory::CrossCutting,
            "Financial inclusion focus",
        ));
    }

    out
}

/// Full rule-based assessment.
pub fn assess(venture: &Venture) -> VentureAssessment {
    let profile = SignalProfile::detect(venture);

    VentureAssessment {
        readiness_score: readiness_score(venture),
        gedsi_alignment: alignment_from(&profile),
        recommendations: recommendations(venture),
        suggested_metrics: suggestions_from(&profile),
        risk_assessment: default_risk_assessment(),
        improvement_potential: improvement_potential(venture),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_scenario() {
        let venture = Venture::new("Acme", "Retail")
            .with_operational("businessPlan", true)
            .with_operational("financialProjections", false)
            .with_capital("pitchDeck", false);

        // operational 50, capital 0
        assert_eq!(readiness_score(&venture), 25);
        assert_eq!(improvement_potential(&venture), 75.0);
    }

    #[test]
    fn test_readiness_with_empty_objects_is_zero() {
        let venture = Venture::new("Acme", "Retail");
        assert_eq!(readiness_score(&venture), 0);
        assert_eq!(improvement_potential(&venture), 100.0);
    }

    #[test]
    fn test_readiness_rounds_and_stays_in_range() {
        let venture = Venture::new("Acme", "Retail")
            .with_operational("a", true)
            .with_operational("b", true)
            .with_operational("c", false)
            .with_capital("d", true);

        // (66.67 + 100) / 2 = 83.33
        assert_eq!(readiness_score(&venture), 83);
        assert_eq!(improvement_potential(&venture), 16.7);
    }

    #[test]
    fn test_alignment_scenario() {
        let venture = Venture::new("Acme", "Software")
            .with_founder_types(["women-led"])
            .with_inclusion_focus("supporting women in tech");
        assert_eq!(gedsi_alignment(&venture), 75);
    }

    #[test]
    fn test_alignment_base_and_clamp() {
        assert_eq!(gedsi_alignment(&Venture::new("Acme", "Software")), 50);

        let everything = Venture::new("Acme", "Software")
            .with_founder_types([
                "women-led",
                "disability-inclusive",
                "rural-focus",
                "indigenous-led",
            ])
            .with_inclusion_focus("Gender equity, accessibility and rural community outreach");
        assert_eq!(gedsi_alignment(&everything), 100);
    }

    #[test]
    fn test_recommendations_order_and_cap() {
        let venture = Venture::new("FarmPay", "Agriculture Fintech");
        let recs = recommendations(&venture);

        assert_eq!(recs.len(), 5);
        assert!(recs[0].starts_with("Develop a business plan"));
        assert!(recs[3].starts_with("Compile up-to-date financial statements"));
        assert!(recs[4].starts_with("Map smallholder supply chains"));
    }

    #[test]
    fn test_no_recommendations_for_ready_generic_venture() {
        let venture = Venture::new("Acme", "Retail")
            .with_operational("businessPlan", true)
            .with_operational("financialProjections", true)
            .with_capital("pitchDeck", true)
            .with_capital("financialStatements", true);
        assert!(recommendations(&venture).is_empty());
    }

    #[test]
    fn test_suggested_metrics_follow_signals() {
        let venture = Venture::new("PayLink", "Fintech")
            .with_founder_types(["youth-led", "disability-inclusive"])
            .with_inclusion_focus("serving women and rural communities");

        let codes: Vec<String> = suggested_metrics(&venture).into_iter().map(|m| m.code).collect();
        assert_eq!(codes, vec!["OI.1", "OI.2", "OI.3", "OI.4", "OI.6"]);

        assert!(suggested_metrics(&Venture::new("Acme", "Retail")).is_empty());
    }

    #[test]
    fn test_assess_uses_static_risk_profile() {
        let assessment = assess(&Venture::new("Acme", "Retail"));
        assert_eq!(assessment.risk_assessment.level, RiskLevel::Medium);
        assert_eq!(assessment.risk_assessment.risks.len(), 3);
        assert_eq!(assessment.risk_assessment.mitigations.len(), 3);
        assert_eq!(assessment.recommendations.len(), 4);
    }
}
