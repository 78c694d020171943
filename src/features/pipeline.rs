//! Feature extraction pipeline: URL → split → lexical/host/path/evasion groups → vector.

use super::lexical::{ratio, shannon_entropy, CharStats};
use super::url_parts::{is_ipv4_literal, registrable_domain, UrlParts};
use super::{Feature, FeatureVector, Lexicon};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Stateless extractor; cheap to clone and safe to share across threads.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    lexicon: Arc<Lexicon>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(Arc::new(Lexicon::default()))
    }
}

impl FeatureExtractor {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Arc<Lexicon> {
        &self.lexicon
    }

    /// Extract the full vector. Never fails: unparseable input yields the all-default vector.
    pub fn extract(&self, url: &str) -> FeatureVector {
        match self.try_extract(url) {
            Some(fv) if fv.is_finite() => fv,
            _ => {
                debug!(url, "feature extraction degraded to defaults");
                FeatureVector::default()
            }
        }
    }

    /// Extract many URLs in parallel, preserving input order.
    pub fn extract_batch<S: AsRef<str> + Sync>(&self, urls: &[S]) -> Vec<FeatureVector> {
        urls.par_iter().map(|u| self.extract(u.as_ref())).collect()
    }

    fn try_extract(&self, url: &str) -> Option<FeatureVector> {
        let parts = UrlParts::parse(url)?;
        let lex = self.lexicon.as_ref();
        let lower = url.to_lowercase();
        let mut fv = FeatureVector::default();

        // Lexical
        let st = CharStats::of(url);
        fv.set(Feature::UrlLength, st.len as f64);
        fv.set(
            Feature::SpecialCharCount,
            url.chars().filter(|c| lex.special_chars.contains(c)).count() as f64,
        );
        fv.set(Feature::DigitRatio, ratio(st.digits, st.len));
        fv.set(Feature::LetterRatio, ratio(st.letters, st.len));
        fv.set(Feature::VowelRatio, ratio(st.vowels, st.len));
        fv.set(Feature::ConsonantRatio, ratio(st.consonants, st.len));
        fv.set(Feature::UppercaseRatio, ratio(st.uppercase, st.len));
        fv.set(Feature::UrlEntropy, shannon_entropy(url));

        // Host
        let host = parts.host.as_str();
        let host_len = host.chars().count();
        let dots = host.matches('.').count();
        let subdomains = dots.saturating_sub(1);
        let tokens: Vec<&str> = host.split('.').filter(|t| !t.is_empty()).collect();
        let tld = host.rsplit('.').next().unwrap_or("");
        fv.set(Feature::DomainLength, host_len as f64);
        fv.set_flag(Feature::HasIp, is_ipv4_literal(host));
        fv.set(Feature::SubdomainCount, subdomains as f64);
        fv.set(Feature::DomainDigitRatio, ratio(CharStats::of(host).digits, host_len));
        fv.set_flag(Feature::HasValidTld, lex.common_tlds.iter().any(|t| t == tld));
        fv.set(Feature::DomainHyphenCount, host.matches('-').count() as f64);
        fv.set(Feature::DomainTokenCount, tokens.len() as f64);
        fv.set(
            Feature::LongestDomainToken,
            tokens.iter().map(|t| t.chars().count()).max().unwrap_or(0) as f64,
        );
        fv.set_flag(Feature::DomainLengthSuspicious, host_len > lex.long_domain_threshold);
        fv.set_flag(Feature::MultipleSubdomains, subdomains > 2);

        // Path, query, fragment
        let path = parts.path;
        let path_lower = path.to_lowercase();
        let query_lower = parts.query.to_lowercase();
        fv.set(Feature::PathLength, path.chars().count() as f64);
        fv.set(Feature::PathDepth, path.matches('/').count() as f64);
        fv.set(
            Feature::PathTokenCount,
            path.split('/').filter(|s| !s.is_empty()).count() as f64,
        );
        fv.set_flag(Feature::HasQuery, !parts.query.is_empty());
        fv.set(Feature::QueryLength, parts.query.chars().count() as f64);
        fv.set(
            Feature::QueryParamCount,
            parts.query.split('&').filter(|s| !s.is_empty()).count() as f64,
        );
        fv.set(Feature::FragmentLength, parts.fragment.chars().count() as f64);
        fv.set_flag(
            Feature::PathExtension,
            lex.executable_extensions.iter().any(|ext| path_lower.ends_with(ext.as_str())),
        );
        fv.set_flag(
            Feature::HasSuspiciousChars,
            path.chars().any(|c| lex.suspicious_path_chars.contains(&c)),
        );
        fv.set_flag(Feature::HasMultipleSlashes, path.contains("//"));
        fv.set_flag(Feature::HasMultipleDots, path.contains(".."));

        // Suspicious vocabulary
        let contains_word = |haystack: &str| {
            lex.suspicious_words.iter().any(|w| haystack.contains(w.as_str()))
        };
        let word_count = lex
            .suspicious_words
            .iter()
            .filter(|w| lower.contains(w.as_str()))
            .count();
        fv.set(Feature::SuspiciousWordCount, word_count as f64);
        fv.set_flag(Feature::HasSuspiciousWords, word_count > 0);
        fv.set_flag(Feature::SuspiciousDomain, contains_word(host));
        fv.set_flag(Feature::PathHasSuspiciousWord, contains_word(&path_lower));
        fv.set_flag(Feature::QueryHasSuspiciousWord, contains_word(&query_lower));

        // Evasion indicators
        fv.set_flag(Feature::IsShortenedUrl, is_shortener(host, lex));
        fv.set_flag(Feature::HasTyposquatting, has_typosquatting(host, lex));
        fv.set_flag(
            Feature::HasNumberLetterSubstitution,
            has_number_letter_substitution(host, lex),
        );

        Some(fv)
    }
}

fn is_shortener(host: &str, lex: &Lexicon) -> bool {
    let bare = host.strip_prefix("www.").unwrap_or(host);
    lex.shorteners.iter().any(|s| {
        bare == s || bare.strip_suffix(s.as_str()).is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Share of the brand's distinct characters that also occur in `host`.
fn char_containment(brand: &str, host: &str) -> f64 {
    let brand_chars: HashSet<char> = brand.chars().collect();
    if brand_chars.is_empty() {
        return 0.0;
    }
    let host_chars: HashSet<char> = host.chars().collect();
    brand_chars.intersection(&host_chars).count() as f64 / brand_chars.len() as f64
}

/// Brand token embedded in a host that is not the brand's own registrable domain.
/// Hosts under two-label suffixes such as `co.uk` fire too; see DESIGN.md.
fn has_typosquatting(host: &str, lex: &Lexicon) -> bool {
    if host.is_empty() {
        return false;
    }
    let registrable = registrable_domain(host);
    let label = registrable.split('.').next().unwrap_or("");
    lex.brands.iter().any(|brand| {
        host.contains(brand.as_str())
            && label != brand
            && char_containment(brand, host) >= lex.brand_containment
    })
}

/// Any confusable digit in a host that is not purely numeric. Fires on legitimately
/// alphanumeric hosts too; kept as-is, see DESIGN.md.
fn has_number_letter_substitution(host: &str, lex: &Lexicon) -> bool {
    let numeric_only = host.chars().all(|c| c.is_ascii_digit() || c == '.');
    !numeric_only && host.chars().any(|c| lex.confusable_digits.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COUNT;

    fn extract(url: &str) -> FeatureVector {
        FeatureExtractor::default().extract(url)
    }

    #[test]
    fn safe_url() {
        let fv = extract("https://www.google.com");
        assert!(!fv.flag(Feature::SuspiciousDomain));
        assert!(!fv.flag(Feature::HasTyposquatting));
        assert_eq!(fv[Feature::DomainLength], 14.0);
        assert_eq!(fv[Feature::SubdomainCount], 1.0);
        assert_eq!(fv[Feature::DomainTokenCount], 3.0);
        assert_eq!(fv[Feature::LongestDomainToken], 6.0);
        assert!(fv.flag(Feature::HasValidTld));
        assert_eq!(fv[Feature::PathLength], 0.0);
    }

    #[test]
    fn substituted_brand_with_admin_path() {
        let fv = extract("http://g00gle.com/admin/login.php");
        assert!(fv.flag(Feature::HasNumberLetterSubstitution));
        assert!(fv.flag(Feature::PathHasSuspiciousWord));
        assert!(fv.flag(Feature::PathExtension));
        assert_eq!(fv[Feature::PathDepth], 2.0);
        assert_eq!(fv[Feature::PathTokenCount], 2.0);
        assert_eq!(fv[Feature::SuspiciousWordCount], 2.0);
    }

    #[test]
    fn shortened_url() {
        assert!(extract("http://bit.ly/abc123").flag(Feature::IsShortenedUrl));
        assert!(extract("https://www.bit.ly/x").flag(Feature::IsShortenedUrl));
        assert!(!extract("http://notbit.ly/abc").flag(Feature::IsShortenedUrl));
    }

    #[test]
    fn suspicious_host_words() {
        let fv = extract("http://suspicious-bank-login.com/admin/password.php");
        assert!(fv.flag(Feature::SuspiciousDomain));
        assert_eq!(fv[Feature::DomainHyphenCount], 2.0);
    }

    #[test]
    fn typosquatting_excludes_brand_own_domain() {
        assert!(!extract("https://mail.google.com/inbox").flag(Feature::HasTyposquatting));
        assert!(extract("http://google-verify.net/").flag(Feature::HasTyposquatting));
        assert!(extract("http://paypal.account-update.io/").flag(Feature::HasTyposquatting));
    }

    #[test]
    fn numeric_hosts_are_exempt_from_substitution() {
        let fv = extract("http://10.0.0.1/index.html");
        assert!(fv.flag(Feature::HasIp));
        assert!(!fv.flag(Feature::HasNumberLetterSubstitution));
        assert!(!extract("http://10.0.0/").flag(Feature::HasIp));
    }

    #[test]
    fn query_and_fragment() {
        let fv = extract("https://example.org/search?q=verify&&page=2#results");
        assert!(fv.flag(Feature::HasQuery));
        assert_eq!(fv[Feature::QueryParamCount], 2.0);
        assert_eq!(fv[Feature::QueryLength], 16.0);
        assert_eq!(fv[Feature::FragmentLength], 7.0);
        assert!(fv.flag(Feature::QueryHasSuspiciousWord));
        assert!(!fv.flag(Feature::PathHasSuspiciousWord));
    }

    #[test]
    fn suspicious_path_sequences() {
        let fv = extract("http://example.com//a/../b%20c");
        assert!(fv.flag(Feature::HasMultipleSlashes));
        assert!(fv.flag(Feature::HasMultipleDots));
        assert!(fv.flag(Feature::HasSuspiciousChars));
    }

    #[test]
    fn long_and_deep_hosts() {
        let fv = extract("http://a.b.c.d.this-is-a-really-long-hostname.example.com/");
        assert!(fv.flag(Feature::MultipleSubdomains));
        assert!(fv.flag(Feature::DomainLengthSuspicious));
        assert!(!extract("http://xn--80ak6aa92e.xyz/").flag(Feature::HasValidTld));
    }

    #[test]
    fn every_input_yields_full_finite_vector() {
        let inputs = [
            "",
            "no scheme at all",
            "http://[::1/broken",
            "ftp://ÜNÏCÖDÉ.例え.jp/パス?クエリ#frag",
            "\n\t#?//",
            "javascript:alert(1)",
        ];
        for url in inputs {
            let fv = extract(url);
            assert_eq!(fv.as_slice().len(), FEATURE_COUNT);
            assert!(fv.is_finite(), "non-finite value for {:?}", url);
            assert_eq!(fv.iter().count(), FEATURE_COUNT);
        }
    }

    #[test]
    fn parse_failure_gives_all_defaults() {
        assert_eq!(extract("http://[::1/broken"), FeatureVector::default());
    }

    #[test]
    fn empty_input_is_all_zero() {
        let fv = extract("");
        assert!(fv.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn batch_preserves_order() {
        let urls = vec!["http://bit.ly/a", "https://www.google.com", ""];
        let ex = FeatureExtractor::default();
        let out = ex.extract_batch(&urls);
        assert_eq!(out.len(), 3);
        for (url, fv) in urls.iter().zip(&out) {
            assert_eq!(*fv, ex.extract(url));
        }
    }

    #[test]
    fn repeated_extraction_is_bit_identical() {
        let ex = FeatureExtractor::default();
        for url in ["https://www.google.com", "http://secure-login.verify-account.xyz/update?id=7"] {
            let first = ex.extract(url);
            for _ in 0..100 {
                let again = ex.extract(url);
                assert_eq!(
                    again[Feature::UrlEntropy].to_bits(),
                    first[Feature::UrlEntropy].to_bits()
                );
                assert_eq!(again, first);
            }
        }
    }

    // two-label registrable domain: `co.uk` is not a brand domain
    #[test]
    fn country_code_brand_domain_counts_as_typosquatting() {
        assert!(extract("https://www.google.co.uk/").flag(Feature::HasTyposquatting));
        assert!(!extract("https://www.google.com/").flag(Feature::HasTyposquatting));
    }

    #[test]
    fn swapped_lexicon_changes_rules() {
        let lex = Lexicon {
            shorteners: vec!["sho.rt".into()],
            ..Lexicon::default()
        };
        let ex = FeatureExtractor::new(Arc::new(lex));
        assert_eq!(ex.lexicon().shorteners, vec!["sho.rt".to_string()]);
        assert!(ex.extract("http://sho.rt/x").flag(Feature::IsShortenedUrl));
        assert!(!ex.extract("http://bit.ly/x").flag(Feature::IsShortenedUrl));
    }
}
