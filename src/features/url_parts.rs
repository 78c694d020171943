//! Lenient URL splitting (RFC 3986 appendix B). Accepts anything a browser bar might,
//! including scheme-less and non-ASCII input; only an unbalanced IPv6 bracket fails.

use regex::Regex;
use std::sync::OnceLock;

static URL_RE: OnceLock<Regex> = OnceLock::new();
static IPV4_RE: OnceLock<Regex> = OnceLock::new();

fn url_re() -> &'static Regex {
    URL_RE.get_or_init(|| {
        Regex::new(r"(?s)^(?:([A-Za-z][A-Za-z0-9+.\-]*):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$")
            .expect("static url pattern")
    })
}

fn ipv4_re() -> &'static Regex {
    IPV4_RE.get_or_init(|| {
        Regex::new(r"^[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}$").expect("static ipv4 pattern")
    })
}

/// Components of a URL string, borrowed from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub scheme: &'a str,
    /// Raw authority (`user@host:port`)
    pub netloc: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    pub fragment: &'a str,
    /// Lowercased host with userinfo and port removed
    pub host: String,
}

impl<'a> UrlParts<'a> {
    pub fn parse(url: &'a str) -> Option<Self> {
        let caps = url_re().captures(url)?;
        let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");
        let netloc = group(2);
        if netloc.contains('[') != netloc.contains(']') {
            return None;
        }
        Some(Self {
            scheme: group(1),
            netloc,
            path: group(3),
            query: group(4),
            fragment: group(5),
            host: host_of(netloc),
        })
    }

    /// Last two dot-separated labels of the host
    pub fn registrable_domain(&self) -> String {
        registrable_domain(&self.host)
    }
}

fn host_of(netloc: &str) -> String {
    let without_user = netloc.rsplit_once('@').map(|(_, h)| h).unwrap_or(netloc);
    let host = if let Some(rest) = without_user.strip_prefix('[') {
        rest.split(']').next().unwrap_or("")
    } else {
        match without_user.rsplit_once(':') {
            Some((h, port)) if port.chars().all(|c| c.is_ascii_digit()) => h,
            _ => without_user,
        }
    };
    host.to_lowercase()
}

pub fn registrable_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    let start = labels.len().saturating_sub(2);
    labels[start..].join(".")
}

/// Exact dotted-quad match; no partial or embedded IPs.
pub fn is_ipv4_literal(host: &str) -> bool {
    ipv4_re().is_match(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_full_url() {
        let p = UrlParts::parse("https://user@Sub.Example.com:8443/a/b.php?x=1&y=2#top").unwrap();
        assert_eq!(p.scheme, "https");
        assert_eq!(p.netloc, "user@Sub.Example.com:8443");
        assert_eq!(p.host, "sub.example.com");
        assert_eq!(p.path, "/a/b.php");
        assert_eq!(p.query, "x=1&y=2");
        assert_eq!(p.fragment, "top");
        assert_eq!(p.registrable_domain(), "example.com");
    }

    #[test]
    fn schemeless_input_has_no_host() {
        let p = UrlParts::parse("g00gle.com/admin").unwrap();
        assert_eq!(p.scheme, "");
        assert_eq!(p.host, "");
        assert_eq!(p.path, "g00gle.com/admin");
    }

    #[test]
    fn empty_and_unicode_inputs_parse() {
        assert!(UrlParts::parse("").is_some());
        let p = UrlParts::parse("http://bücher.de/straße").unwrap();
        assert_eq!(p.host, "bücher.de");
    }

    #[test]
    fn unbalanced_bracket_fails() {
        assert!(UrlParts::parse("http://[::1/path").is_none());
        let p = UrlParts::parse("http://[::1]:80/").unwrap();
        assert_eq!(p.host, "::1");
    }

    #[test]
    fn ipv4_detection_is_exact() {
        assert!(is_ipv4_literal("192.168.0.1"));
        assert!(!is_ipv4_literal("192.168.0"));
        assert!(!is_ipv4_literal("192.168.0.1.evil.com"));
        assert!(!is_ipv4_literal("1234.1.1.1"));
    }

    #[test]
    fn registrable_domain_of_short_hosts() {
        assert_eq!(registrable_domain("localhost"), "localhost");
        assert_eq!(registrable_domain(""), "");
    }
}
