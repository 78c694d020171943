//! Evaluates the rule table: whitelist, then hard flags, with a looser fallback set
//! for when the classifier cannot answer.

use super::rules::{RuleInput, RuleKind, RuleTable};
use crate::config::HeuristicsConfig;
use crate::decision::VerdictReason;
use crate::features::{FeatureVector, Lexicon, UrlParts};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of a rule that fired (or of the fallback set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicVerdict {
    pub is_malicious: bool,
    pub confidence: f64,
    pub reason: VerdictReason,
    /// Name of the rule that fired; `None` for a benign fallback
    pub rule: Option<String>,
}

pub struct HeuristicEngine {
    table: RuleTable,
    lexicon: Arc<Lexicon>,
    config: HeuristicsConfig,
}

impl HeuristicEngine {
    pub fn new(config: HeuristicsConfig, lexicon: Arc<Lexicon>) -> Self {
        Self {
            table: RuleTable::from_config(&config),
            lexicon,
            config,
        }
    }

    /// Whitelist first, then hard flags. `None` means no opinion.
    pub fn classify(&self, url: &str, features: &FeatureVector) -> Option<HeuristicVerdict> {
        self.check_whitelist(url, features)
            .or_else(|| self.check_hard_flags(url, features))
    }

    pub fn check_whitelist(&self, url: &str, features: &FeatureVector) -> Option<HeuristicVerdict> {
        self.evaluate(RuleKind::Whitelist, url, features)
            .map(|rule| HeuristicVerdict {
                is_malicious: false,
                confidence: self.config.override_confidence,
                reason: VerdictReason::Whitelist,
                rule: Some(rule),
            })
    }

    pub fn check_hard_flags(&self, url: &str, features: &FeatureVector) -> Option<HeuristicVerdict> {
        self.evaluate(RuleKind::HardFlag, url, features)
            .map(|rule| HeuristicVerdict {
                is_malicious: true,
                confidence: self.config.override_confidence,
                reason: VerdictReason::Heuristic,
                rule: Some(rule),
            })
    }

    /// Heuristic-only verdict used when no model is usable. Always answers.
    pub fn fallback(&self, url: &str, features: &FeatureVector) -> HeuristicVerdict {
        let rule = self.evaluate(RuleKind::FallbackFlag, url, features);
        HeuristicVerdict {
            is_malicious: rule.is_some(),
            confidence: self.config.fallback_confidence,
            reason: VerdictReason::FallbackHeuristic,
            rule,
        }
    }

    fn evaluate(&self, kind: RuleKind, url: &str, features: &FeatureVector) -> Option<String> {
        let registrable = UrlParts::parse(url)
            .map(|p| p.registrable_domain())
            .unwrap_or_default();
        let url_lower = url.to_lowercase();
        let input = RuleInput {
            url,
            url_lower: &url_lower,
            registrable_domain: &registrable,
            features,
            lexicon: &self.lexicon,
        };
        self.table
            .first_match(kind, &input)
            .map(|r| r.name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureExtractor;

    fn engine() -> (HeuristicEngine, FeatureExtractor) {
        let lex = Arc::new(Lexicon::default());
        (
            HeuristicEngine::new(HeuristicsConfig::default(), lex.clone()),
            FeatureExtractor::new(lex),
        )
    }

    fn classify(url: &str) -> Option<HeuristicVerdict> {
        let (engine, ex) = engine();
        engine.classify(url, &ex.extract(url))
    }

    #[test]
    fn whitelist_dominates_hard_flags() {
        // long, sensitive terms, suspicious path word: every hard flag bait
        let url = format!("https://accounts.google.com/admin/login?password=1&x={}", "a".repeat(120));
        let v = classify(&url).unwrap();
        assert!(!v.is_malicious);
        assert_eq!(v.confidence, 0.95);
        assert_eq!(v.reason, VerdictReason::Whitelist);
    }

    #[test]
    fn hard_flags_force_malicious() {
        for url in [
            "http://bit.ly/abc123",
            "http://g00gle.com/",
            "http://paypal-secure.example.net/",
            "http://example.net/admin",
            "http://example.net/x%2e",
        ] {
            let v = classify(url).unwrap_or_else(|| panic!("no verdict for {}", url));
            assert!(v.is_malicious, "{}", url);
            assert_eq!(v.reason, VerdictReason::Heuristic);
            assert_eq!(v.confidence, 0.95);
        }
        let long = format!("http://example.net/{}", "a".repeat(100));
        assert_eq!(classify(&long).unwrap().rule.as_deref(), Some("long_url"));
    }

    #[test]
    fn sensitive_terms_match_anywhere_case_insensitive() {
        let v = classify("http://example.net/?next=PassWord").unwrap();
        assert_eq!(v.rule.as_deref(), Some("sensitive_term"));
    }

    #[test]
    fn clean_url_has_no_opinion() {
        assert!(classify("https://example.org/docs/intro.html").is_none());
    }

    #[test]
    fn fallback_is_looser_and_fixed_confidence() {
        let (engine, ex) = engine();
        let url = "https://example.org/?ref=bonus";
        let fv = ex.extract(url);
        assert!(engine.classify(url, &fv).is_none());
        let v = engine.fallback(url, &fv);
        assert!(!v.is_malicious);
        assert_eq!(v.confidence, 0.7);
        assert_eq!(v.reason, VerdictReason::FallbackHeuristic);

        let url = "https://example.org/?ref=bonus&promo=free";
        let fv = ex.extract(url);
        assert!(engine.classify(url, &fv).is_none());
        let v = engine.fallback(url, &fv);
        assert!(v.is_malicious);
        assert_eq!(v.rule.as_deref(), Some("some_suspicious_words"));
    }
}
