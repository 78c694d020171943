//! Feature layout: the ordered name set every vector and every model artifact agrees on.
//!
//! Adding, removing, or reordering a feature requires bumping [`FEATURE_VERSION`];
//! artifacts carry the version and [`layout_fingerprint`] and are rejected on mismatch.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};

/// Current feature layout version
pub const FEATURE_VERSION: u32 = 1;

macro_rules! feature_layout {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// One named slot of the feature vector, in positional order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Feature {
            $($variant),+
        }

        impl Feature {
            pub const ALL: &'static [Feature] = &[$(Feature::$variant),+];

            pub fn name(self) -> &'static str {
                match self {
                    $(Feature::$variant => $name),+
                }
            }
        }

        /// Feature names in the exact order they appear in the vector
        pub const FEATURE_LAYOUT: &[&str] = &[$($name),+];
    };
}

feature_layout! {
    UrlLength => "url_length",
    SpecialCharCount => "special_char_count",
    DigitRatio => "digit_ratio",
    LetterRatio => "letter_ratio",
    DomainLength => "domain_length",
    HasIp => "has_ip",
    SubdomainCount => "subdomain_count",
    DomainDigitRatio => "domain_digit_ratio",
    HasValidTld => "has_valid_tld",
    DomainHyphenCount => "domain_hyphen_count",
    DomainTokenCount => "domain_token_count",
    LongestDomainToken => "longest_domain_token",
    PathLength => "path_length",
    PathDepth => "path_depth",
    HasQuery => "has_query",
    QueryLength => "query_length",
    FragmentLength => "fragment_length",
    PathTokenCount => "path_token_count",
    QueryParamCount => "query_param_count",
    PathExtension => "path_extension",
    VowelRatio => "vowel_ratio",
    ConsonantRatio => "consonant_ratio",
    UppercaseRatio => "uppercase_ratio",
    UrlEntropy => "url_entropy",
    SuspiciousWordCount => "suspicious_word_count",
    HasSuspiciousWords => "has_suspicious_words",
    SuspiciousDomain => "suspicious_domain",
    DomainLengthSuspicious => "domain_length_suspicious",
    MultipleSubdomains => "multiple_subdomains",
    PathHasSuspiciousWord => "path_has_suspicious_word",
    QueryHasSuspiciousWord => "query_has_suspicious_word",
    HasSuspiciousChars => "has_suspicious_chars",
    HasMultipleSlashes => "has_multiple_slashes",
    HasMultipleDots => "has_multiple_dots",
    IsShortenedUrl => "is_shortened_url",
    HasTyposquatting => "has_typosquatting",
    HasNumberLetterSubstitution => "has_number_letter_substitution",
}

/// Total number of features
pub const FEATURE_COUNT: usize = FEATURE_LAYOUT.len();

impl Feature {
    /// Position in the vector
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// SHA-256 over version + ordered names, base64 encoded.
pub fn layout_fingerprint() -> String {
    let mut hasher = Sha256::new();
    hasher.update(FEATURE_VERSION.to_le_bytes());
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
    }
    BASE64.encode(hasher.finalize())
}
