//! Versioned word lists and thresholds used by extraction and the heuristic rules.
//! Loadable from JSON so rule data can change without rebuilding the extractor.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    pub version: u32,
    /// Characters counted by `special_char_count`
    pub special_chars: Vec<char>,
    pub suspicious_words: Vec<String>,
    /// TLD allow-list for `has_valid_tld`
    pub common_tlds: Vec<String>,
    pub shorteners: Vec<String>,
    /// Brand tokens checked for typosquatting
    pub brands: Vec<String>,
    /// Digits that stand in for letters (0→o, 1→l, 3→e, 4→a, 5→s)
    pub confusable_digits: Vec<char>,
    /// Executable/script extensions, with leading dot
    pub executable_extensions: Vec<String>,
    pub suspicious_path_chars: Vec<char>,
    /// Host length above which `domain_length_suspicious` is set
    pub long_domain_threshold: usize,
    /// Minimum share of a brand's distinct characters found in the host
    pub brand_containment: f64,
    /// Registrable domains that are always benign
    pub trusted_domains: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            version: 1,
            special_chars: vec![
                '@', '?', '!', '#', '$', '%', '^', '&', '*', '(', ')', '-', '+', '=', '[', ']',
                '{', '}', '|', '\\',
            ],
            suspicious_words: strings(&[
                "login", "signin", "bank", "verify", "account", "update", "secure", "admin",
                "password", "confirm", "billing", "wallet", "suspend", "webscr", "ebayisapi",
                "free", "bonus", "lucky",
            ]),
            common_tlds: strings(&[
                "com", "org", "net", "edu", "gov", "mil", "int", "io", "co", "uk", "de", "fr",
                "eu", "info", "hr",
            ]),
            shorteners: strings(&[
                "bit.ly", "goo.gl", "tinyurl.com", "t.co", "ow.ly", "is.gd", "buff.ly", "adf.ly",
                "bitly.com", "cutt.ly", "shorturl.at", "rb.gy", "tiny.cc",
            ]),
            brands: strings(&[
                "google", "facebook", "paypal", "amazon", "apple", "microsoft", "netflix",
                "instagram", "twitter", "linkedin", "ebay", "yahoo", "dropbox", "github",
            ]),
            confusable_digits: vec!['0', '1', '3', '4', '5'],
            executable_extensions: strings(&[
                ".exe", ".php", ".js", ".sh", ".bat", ".cmd", ".scr", ".jar", ".vbs", ".ps1",
                ".dll", ".msi", ".apk", ".bin",
            ]),
            suspicious_path_chars: vec!['%'],
            long_domain_threshold: 30,
            brand_containment: 0.7,
            trusted_domains: strings(&[
                "google.com",
                "microsoft.com",
                "github.com",
                "wikipedia.org",
                "python.org",
                "apple.com",
                "amazon.com",
                "facebook.com",
            ]),
        }
    }
}

impl Lexicon {
    /// Load a lexicon from a JSON file. Missing fields take the built-in values.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let lexicon: Lexicon = serde_json::from_str(&data)?;
        lexicon.normalized()
    }

    /// Lowercase word lists and validate thresholds.
    pub fn normalized(mut self) -> Result<Self> {
        if !(0.0..=1.0).contains(&self.brand_containment) {
            return Err(Error::Lexicon(format!(
                "brand_containment must be within [0, 1], got {}",
                self.brand_containment
            )));
        }
        for list in [
            &mut self.suspicious_words,
            &mut self.common_tlds,
            &mut self.shorteners,
            &mut self.brands,
            &mut self.executable_extensions,
            &mut self.trusted_domains,
        ] {
            for item in list.iter_mut() {
                *item = item.trim().to_lowercase();
            }
            list.retain(|s| !s.is_empty());
        }
        Ok(self)
    }

    pub fn is_trusted(&self, registrable_domain: &str) -> bool {
        self.trusted_domains.iter().any(|d| d == registrable_domain)
    }
}
