//! The detector contract.
//!
//! The filter does not decide on its own whether content is an attack. A
//! [`Detector`] compares script text or resource URLs with the request
//! parameters and reports which parameters were reflected. The filter only
//! sequences these calls and acts on the answer.
//!
//! The provided methods cover the parts of the contract that do not depend
//! on a signature grammar: parsing parameters out of URLs and form bodies,
//! grouping hosts by registrable domain and repeated unescaping.

use crate::params::ParameterSet;
use std::borrow::Cow;
use url::{form_urlencoded, Host, Url};

/// Upper bound on unescape rounds for nested encodings.
pub const MAX_UNESCAPE_ROUNDS: usize = 10;

/// Two-label public suffixes the fallback domain rule knows about.
const COMMON_TWO_PART_SUFFIXES: &[&str] = &[
    "co.uk", "co.jp", "co.nz", "co.za", "co.in", "co.kr",
    "com.au", "com.br", "com.cn", "com.mx", "com.tw", "com.hk",
    "net.au", "net.nz",
    "org.uk", "org.au",
    "gov.uk", "gov.au",
    "ac.uk", "ac.jp",
    "ne.jp", "or.jp",
];

/// Parameters a single check found reflected in the inspected content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Findings {
    matched: Vec<String>,
}

impl Findings {
    /// Nothing matched.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether any parameter matched.
    pub fn has_attack(&self) -> bool {
        !self.matched.is_empty()
    }

    /// Names of the matched parameters.
    pub fn matched(&self) -> &[String] {
        &self.matched
    }
}

impl<S: Into<String>> FromIterator<S> for Findings {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            matched: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Signature matcher for reflected injection.
pub trait Detector: Send + Sync {
    /// Check script text against the request parameters.
    fn check_inline(&self, content: &str, params: &ParameterSet) -> Findings;

    /// Check an external resource URL, loaded by `page`, against the
    /// request parameters.
    fn check_external(&self, target: &Url, page: &Url, params: &ParameterSet) -> Findings;

    /// Whether the findings of a check amount to an attack.
    fn has_attack(&self, findings: &Findings) -> bool {
        findings.has_attack()
    }

    /// Add the query string parameters of `uri`.
    fn parse_uri(&self, uri: &Url, params: &mut ParameterSet) {
        params.extend(uri.query_pairs());
    }

    /// Add the parameters of a url-encoded POST body.
    fn parse_post(&self, body: &[u8], params: &mut ParameterSet) {
        params.extend(form_urlencoded::parse(body));
    }

    /// Cache and comparison key for `uri`.
    fn domain(&self, uri: &Url) -> String {
        registrable_domain(uri)
    }

    /// Undo nested percent-encoding.
    fn unescape_loop(&self, input: &str) -> String {
        unescape_loop(input)
    }
}

/// Registrable domain (eTLD+1) of a URL's host, by a fixed heuristic.
///
/// IP addresses and single-label hosts are their own domain. URLs without a
/// host, such as `data:` URLs, map to the empty string.
pub fn registrable_domain(uri: &Url) -> String {
    match uri.host() {
        Some(Host::Domain(domain)) => {
            let host = domain.trim_end_matches('.').to_ascii_lowercase();
            let labels: Vec<&str> = host.split('.').collect();
            let n = labels.len();
            if n <= 2 {
                return host;
            }

            let last_two = format!("{}.{}", labels[n - 2], labels[n - 1]);
            if COMMON_TWO_PART_SUFFIXES.contains(&last_two.as_str()) {
                labels[n - 3..].join(".")
            } else {
                last_two
            }
        }
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => format!("[{}]", addr),
        None => String::new(),
    }
}

/// Percent-decode until the text stops changing.
pub fn unescape_loop(input: &str) -> String {
    let mut current = input.to_string();

    for _ in 0..MAX_UNESCAPE_ROUNDS {
        let decoded = match urlencoding::decode(&current) {
            Ok(decoded) => decoded,
            Err(_) => {
                let bytes = urlencoding::decode_binary(current.as_bytes());
                Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())
            }
        };
        if decoded == current {
            break;
        }
        current = decoded.into_owned();
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullDetector;

    impl Detector for NullDetector {
        fn check_inline(&self, _content: &str, _params: &ParameterSet) -> Findings {
            Findings::none()
        }

        fn check_external(&self, _target: &Url, _page: &Url, _params: &ParameterSet) -> Findings {
            Findings::none()
        }
    }

    fn domain(s: &str) -> String {
        registrable_domain(&Url::parse(s).unwrap())
    }

    #[test]
    fn test_registrable_domain() {
        assert_eq!(domain("https://example.com/a.js"), "example.com");
        assert_eq!(domain("https://cdn.static.Example.com/a.js"), "example.com");
        assert_eq!(domain("https://www.bbc.co.uk/"), "bbc.co.uk");
        assert_eq!(domain("http://localhost:8080/"), "localhost");
        assert_eq!(domain("http://192.168.0.1/x"), "192.168.0.1");
        assert_eq!(domain("http://[::1]/x"), "[::1]");
        assert_eq!(domain("data:text/html,<b>hi</b>"), "");
    }

    #[test]
    fn test_unescape_loop_nested() {
        assert_eq!(unescape_loop("javascript:alert(1)"), "javascript:alert(1)");
        assert_eq!(unescape_loop("%3Cscript%3E"), "<script>");
        assert_eq!(unescape_loop("%253Cscript%253E"), "<script>");
        assert_eq!(unescape_loop("%25253Cb%25253E"), "<b>");
    }

    #[test]
    fn test_unescape_loop_invalid_utf8() {
        assert_eq!(unescape_loop("a%FFb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_findings() {
        assert!(!Findings::none().has_attack());

        let findings: Findings = ["q"].into_iter().collect();
        assert!(findings.has_attack());
        assert_eq!(findings.matched(), ["q".to_string()]);
        assert!(NullDetector.has_attack(&findings));
    }

    #[test]
    fn test_default_parsing() {
        let detector = NullDetector;
        let mut params = ParameterSet::new();

        detector.parse_uri(&Url::parse("https://example.com/?q=%3Cb%3E&x").unwrap(), &mut params);
        detector.parse_post(b"name=a+b&c=%22", &mut params);

        assert_eq!(params.get("q"), Some("<b>"));
        assert_eq!(params.get("x"), Some(""));
        assert_eq!(params.get("name"), Some("a b"));
        assert_eq!(params.get("c"), Some("\""));
        assert_eq!(params.len(), 4);
    }
}
