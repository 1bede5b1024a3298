//! Prompt assembly for venture scoring.

use impact_metrics::Venture;

/// Builds the prompts sent to the generative backend.
pub struct PromptAssembler;

impl PromptAssembler {
    /// System prompt fixing the analyst role and the output contract.
    pub fn build_system_prompt() -> String {
        let mut prompt = String::new();

        prompt.push_str("# ROLE\n\n");
        prompt.push_str("You are an impact investment analyst assessing early-stage ventures.\n");
        prompt.push_str("You evaluate investment readiness and alignment with gender equality, ");
        prompt.push_str("disability and social inclusion (GEDSI) goals.\n\n");

        prompt.push_str("## RULES\n\n");
        prompt.push_str("1. Respond with a single JSON object and nothing else\n");
        prompt.push_str("2. All scores are integers between 0 and 100\n");
        prompt.push_str("3. Give at most 5 recommendations and at most 5 suggested metrics\n");
        prompt.push_str("4. Base every statement on the venture profile provided\n");

        prompt
    }

    /// User prompt describing one venture and the expected response shape.
    pub fn build_assessment_prompt(venture: &Venture) -> String {
        let mut prompt = String::new();

        prompt.push_str("# VENTURE ASSESSMENT REQUEST\n\n");
        prompt.push_str("## Venture Profile\n\n");
        prompt.push_str(&format!("- **Name**: {}\n", venture.name));
        prompt.push_str(&format!("- **Sector**: {}\n", venture.sector));
        prompt.push_str(&format!("- **Stage**: {}\n", venture.stage));
        if let Some(location) = &venture.location {
            prompt.push_str(&format!("- **Location**: {}\n", location));
        }
        prompt.push_str(&format!("- **Funding raised**: {:.2}\n", venture.funding_raised));
        prompt.push_str(&format!("- **Team size**: {}\n", venture.team_size));

        let founders = if venture.founder_types.is_empty() {
            "none recorded".to_string()
        } else {
            venture.founder_types.join(", ")
        };
        prompt.push_str(&format!("- **Founder types**: {}\n", founders));

        let focus = venture.inclusion_focus.trim();
        if !focus.is_empty() {
            prompt.push_str(&format!("- **Inclusion focus**: {}\n", focus));
        }

        prompt.push_str("\n## Operational Readiness\n\n");
        push_flags(&mut prompt, &venture.operational_readiness);

        prompt.push_str("\n## Capital Readiness\n\n");
        push_flags(&mut prompt, &venture.capital_readiness);

        prompt.push_str("\n## Required Response Format\n\n");
        prompt.push_str("```json\n");
        prompt.push_str("{\n");
        prompt.push_str("  \"readinessScore\": 0-100,\n");
        prompt.push_str("  \"gedsiAlignment\": 0-100,\n");
        prompt.push_str("  \"recommendations\": [\"<action>\"],\n");
        prompt.push_str("  \"suggestedMetrics\": [\n");
        prompt.push_str("    {\"code\": \"OI.1\", \"name\": \"<indicator>\", ");
        prompt.push_str("\"category\": \"gender|disability|social_inclusion|cross_cutting\", ");
        prompt.push_str("\"unit\": \"people\", \"rationale\": \"<why>\"}\n");
        prompt.push_str("  ],\n");
        prompt.push_str("  \"riskAssessment\": {\"level\": \"low|medium|high\", ");
        prompt.push_str("\"risks\": [\"<risk>\"], \"mitigations\": [\"<mitigation>\"]},\n");
        prompt.push_str("  \"improvementPotential\": 0-100\n");
        prompt.push_str("}\n");
        prompt.push_str("```\n");

        prompt
    }
}

fn push_flags(prompt: &mut String, flags: &std::collections::BTreeMap<String, bool>) {
    if flags.is_empty() {
        prompt.push_str("- (no items recorded)\n");
        return;
    }
    for (name, done) in flags {
        let marker = if *done { "[x]" } else { "[ ]" };
        prompt.push_str(&format!("- {} {}\n", marker, name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_demands_json() {
        let prompt = PromptAssembler::build_system_prompt();
        assert!(prompt.contains("single JSON object"));
    }

    #[test]
    fn test_assessment_prompt_includes_profile() {
        let venture = Venture::new("SolarKiosk", "Energy")
            .with_founder_types(["women-led"])
            .with_operational("businessPlan", true)
            .with_capital("pitchDeck", false);

        let prompt = PromptAssembler::build_assessment_prompt(&venture);
        assert!(prompt.contains("**Name**: SolarKiosk"));
        assert!(prompt.contains("**Founder types**: women-led"));
        assert!(prompt.contains("- [x] businessPlan"));
        assert!(prompt.contains("- [ ] pitchDeck"));
        assert!(prompt.contains("\"improvementPotential\""));
        assert!(!prompt.contains("Inclusion focus"));
    }
}
