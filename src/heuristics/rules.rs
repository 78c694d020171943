//! The single ordered rule table. Every override decision in the crate comes from here.

use crate::config::HeuristicsConfig;
use crate::features::{Feature, FeatureVector, Lexicon};
use serde::{Deserialize, Serialize};

/// Which stage of the decision flow a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Trusted registrable domain; forces benign and dominates all other rules
    Whitelist,
    /// Forces malicious before the model runs
    HardFlag,
    /// Looser set used only when no model is usable
    FallbackFlag,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    TrustedDomain,
    Flag(Feature),
    Exceeds(Feature, f64),
    UrlLongerThan(usize),
    ContainsAnyTerm(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: &'static str,
    pub kind: RuleKind,
    pub condition: Condition,
}

/// Inputs a condition is evaluated against.
pub struct RuleInput<'a> {
    pub url: &'a str,
    pub url_lower: &'a str,
    pub registrable_domain: &'a str,
    pub features: &'a FeatureVector,
    pub lexicon: &'a Lexicon,
}

impl Condition {
    pub fn holds(&self, input: &RuleInput<'_>) -> bool {
        match self {
            Condition::TrustedDomain => input.lexicon.is_trusted(input.registrable_domain),
            Condition::Flag(f) => input.features.flag(*f),
            Condition::Exceeds(f, limit) => input.features.get(*f) > *limit,
            Condition::UrlLongerThan(n) => input.url.chars().count() > *n,
            Condition::ContainsAnyTerm(terms) => {
                terms.iter().any(|t| input.url_lower.contains(t.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn from_config(config: &HeuristicsConfig) -> Self {
        use Condition::*;
        use RuleKind::*;

        let terms = config
            .sensitive_terms
            .iter()
            .map(|t| t.to_lowercase())
            .collect();
        let rule = |name, kind, condition| Rule {
            name,
            kind,
            condition,
        };
        Self {
            rules: vec![
                rule("trusted_domain", Whitelist, TrustedDomain),
                rule("shortened_url", HardFlag, Flag(Feature::IsShortenedUrl)),
                rule("typosquatting", HardFlag, Flag(Feature::HasTyposquatting)),
                rule(
                    "number_letter_substitution",
                    HardFlag,
                    Flag(Feature::HasNumberLetterSubstitution),
                ),
                rule("long_url", HardFlag, UrlLongerThan(config.max_url_length)),
                rule(
                    "many_suspicious_words",
                    HardFlag,
                    Exceeds(Feature::SuspiciousWordCount, config.hard_word_limit),
                ),
                rule("suspicious_host_word", HardFlag, Flag(Feature::SuspiciousDomain)),
                rule("suspicious_path_word", HardFlag, Flag(Feature::PathHasSuspiciousWord)),
                rule("suspicious_path_chars", HardFlag, Flag(Feature::HasSuspiciousChars)),
                rule("sensitive_term", HardFlag, ContainsAnyTerm(terms)),
                rule("suspicious_host_word", FallbackFlag, Flag(Feature::SuspiciousDomain)),
                rule("suspicious_path_chars", FallbackFlag, Flag(Feature::HasSuspiciousChars)),
                rule(
                    "some_suspicious_words",
                    FallbackFlag,
                    Exceeds(Feature::SuspiciousWordCount, config.fallback_word_limit),
                ),
            ],
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First rule of `kind` whose condition holds, in table order.
    pub fn first_match(&self, kind: RuleKind, input: &RuleInput<'_>) -> Option<&Rule> {
        self.rules
            .iter()
            .filter(|r| r.kind == kind)
            .find(|r| r.condition.holds(input))
    }
}
