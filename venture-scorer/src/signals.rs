//! GEDSI signal detection.
//!
//! Signals come from three places on a venture: its founder-type tags, the
//! free-text inclusion focus, and its sector. Each source is matched against
//! a static rule table; a rule carries the signal it raises and the bonus it
//! contributes to the GEDSI alignment score. Rules with a zero bonus only
//! raise signals (used for metric suggestions).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use impact_metrics::Venture;

/// Something about a venture that shapes its GEDSI profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Gender,
    Disability,
    Rural,
    Indigenous,
    Youth,
    FinancialInclusion,
}

/// Founder-type tag rule, matched on the normalised tag.
#[derive(Debug, Clone, Copy)]
pub struct FounderRule {
    pub tag: &'static str,
    pub signal: Signal,
    pub bonus: u32,
}

/// Keyword rule, matched case-insensitively as a substring.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub keywords: &'static [&'static str],
    pub signal: Signal,
    pub bonus: u32,
}

/// Founder-type tags.
pub const FOUNDER_RULES: &[FounderRule] = &[
    FounderRule {
        tag: "women-led",
        signal: Signal::Gender,
        bonus: 15,
    },
    FounderRule {
        tag: "disability-inclusive",
        signal: Signal::Disability,
        bonus: 15,
    },
    FounderRule {
        tag: "rural-focus",
        signal: Signal::Rural,
        bonus: 10,
    },
    FounderRule {
        tag: "indigenous-led",
        signal: Signal::Indigenous,
        bonus: 10,
    },
    FounderRule {
        tag: "youth-led",
        signal: Signal::Youth,
        bonus: 0,
    },
];

/// Inclusion-focus text.
pub const FOCUS_RULES: &[KeywordRule] = &[
    KeywordRule {
        keywords: &["gender", "women"],
        signal: Signal::Gender,
        bonus: 10,
    },
    KeywordRule {
        keywords: &["disability", "accessibility"],
        signal: Signal::Disability,
        bonus: 10,
    },
    KeywordRule {
        keywords: &["rural", "community"],
        signal: Signal::Rural,
        bonus: 10,
    },
    KeywordRule {
        keywords: &["youth", "young people"],
        signal: Signal::Youth,
        bonus: 0,
    },
    KeywordRule {
        keywords: &["financial inclusion", "fintech", "unbanked"],
        signal: Signal::FinancialInclusion,
        bonus: 0,
    },
];

/// Sector name.
pub const SECTOR_RULES: &[KeywordRule] = &[KeywordRule {
    keywords: &["fintech", "financial services"],
    signal: Signal::FinancialInclusion,
    bonus: 0,
}];

/// Lowercase, with `_` and spaces folded to `-`.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '_' || c.is_whitespace() { '-' } else { c })
        .collect()
}

impl KeywordRule {
    /// Whether any keyword appears in `text`.
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k))
    }
}

/// A rule that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub signal: Signal,
    pub bonus: u32,
}

/// Signals detected on a venture, with the bonuses that raised them.
#[derive(Debug, Clone, Default)]
pub struct SignalProfile {
    matches: Vec<Match>,
}

impl SignalProfile {
    /// Run every rule table against the venture.
    ///
    /// A founder rule fires at most once however often its tag repeats.
    pub fn detect(venture: &Venture) -> Self {
        let tags: BTreeSet<String> = venture
            .founder_types
            .iter()
            .map(|t| normalize_tag(t))
            .collect();
        let mut matches = Vec::new();

        for rule in FOUNDER_RULES {
            if tags.contains(rule.tag) {
                matches.push(Match {
                    signal: rule.signal,
                    bonus: rule.bonus,
                });
            }
        }

        for rule in FOCUS_RULES {
            if rule.matches(&venture.inclusion_focus) {
                matches.push(Match {
                    signal: rule.signal,
                    bonus: rule.bonus,
                });
            }
        }

        for rule in SECTOR_RULES {
            if rule.matches(&venture.sector) {
                matches.push(Match {
                    signal: rule.signal,
                    bonus: rule.bonus,
                });
            }
        }

        Self { matches }
    }

    /// Whether any rule raised `signal`.
    pub fn has(&self, signal: Signal) -> bool {
        self.matches.iter().any(|m| m.signal == signal)
    }

    /// Sum of all fired bonuses.
    pub fn total_bonus(&self) -> u32 {
        self.matches.iter().map(|m| m.bonus).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag(" Women_Led "), "women-led");
        assert_eq!(normalize_tag("Rural focus"), "rural-focus");
    }

    #[test]
    fn test_keyword_rule_is_case_insensitive() {
        let rule = FOCUS_RULES[1];
        assert!(rule.matches("Improving ACCESSIBILITY of clinics"));
        assert!(!rule.matches("clean energy"));
    }

    #[test]
    fn test_detect_founder_and_focus() {
        let venture = Venture::new("Acme", "Agriculture")
            .with_founder_types(["women-led", "Women Led"])
            .with_inclusion_focus("supporting women in tech");

        let profile = SignalProfile::detect(&venture);
        assert!(profile.has(Signal::Gender));
        assert!(!profile.has(Signal::Rural));
        assert_eq!(profile.total_bonus(), 25);
    }

    #[test]
    fn test_fintech_sector_raises_financial_inclusion() {
        let venture = Venture::new("PayLink", "FinTech");
        let profile = SignalProfile::detect(&venture);
        assert!(profile.has(Signal::FinancialInclusion));
        assert_eq!(profile.total_bonus(), 0);
    }

    #[test]
    fn test_every_scoring_rule_has_a_bonus_source() {
        let scoring: BTreeSet<Signal> = FOUNDER_RULES
            .iter()
            .filter(|r| r.bonus > 0)
            .map(|r| r.signal)
            .collect();
        assert!(scoring.contains(&Signal::Gender));
        assert!(scoring.contains(&Signal::Indigenous));
    }
}
