//! Per-page XSS filter.
//!
//! Every document gets its own [`XssFilter`]. The DOM and script engine ask
//! it before running or loading anything that can execute script. The
//! filter compares the script or URL with the parameters of the request
//! that loaded the page; a match means the page is reflecting attacker
//! input and the operation is denied (or only reported in report-only mode).

use crate::cache::DomainVerdictCache;
use crate::config::{FilterConfig, SharedConfig};
use crate::detector::{Detector, Findings};
use crate::header::{HeaderPolicy, HeaderSource};
use crate::params::{extract_parameters, ParameterSet};
use crate::report::{PolicyKind, Violation, ViolationReporter};
use networking::headers::names::X_XSS_PROTECTION;
use networking::HttpChannel;
use once_cell::unsync::OnceCell;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// How much of inspected content goes into debug logs.
const LOG_SNIPPET_CHARS: usize = 70;
const LOG_CODE_SNIPPET_CHARS: usize = 100;

/// Reflected XSS filter for one document.
pub struct XssFilter {
    document_uri: Url,
    channel: Option<Arc<dyn HttpChannel>>,
    config: SharedConfig,
    detector: Arc<dyn Detector>,
    reporter: ViolationReporter,
    header: OnceCell<HeaderPolicy>,
    meta_block_mode: bool,
    params: OnceCell<ParameterSet>,
    domain_cache: DomainVerdictCache,
}

impl XssFilter {
    /// Create a filter for the document at `document_uri`.
    pub fn new(document_uri: Url, config: SharedConfig, detector: Arc<dyn Detector>) -> Self {
        Self {
            document_uri,
            channel: None,
            config,
            detector,
            reporter: ViolationReporter::default(),
            header: OnceCell::new(),
            meta_block_mode: false,
            params: OnceCell::new(),
            domain_cache: DomainVerdictCache::new(),
        }
    }

    /// Attach the channel that loaded the document.
    pub fn with_channel(mut self, channel: Arc<dyn HttpChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Use `reporter` for violations.
    pub fn with_reporter(mut self, reporter: ViolationReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Check an inline `<script>` before it runs.
    pub fn permits_inline_script(&self, script: &str) -> bool {
        self.check_inline(PolicyKind::InlineScript, script, script, LOG_SNIPPET_CHARS)
    }

    /// Check an external script before it is fetched.
    ///
    /// Scripts inserted by other scripts are only checked when the global
    /// configuration asks for it.
    pub fn permits_external_script(&mut self, uri: Option<&Url>, is_dynamic: bool) -> bool {
        let Some(uri) = uri else {
            return true;
        };

        let config = self.config.snapshot();
        if !self.enabled_with(&config) {
            return true;
        }
        if is_dynamic && !config.block_dynamic_scripts {
            return true;
        }

        tracing::trace!(target: "xss", "External script: {}", uri);
        self.check_external_cached(PolicyKind::ExternalScript, uri, &config)
    }

    /// Check a `javascript:` URL before it is evaluated.
    pub fn permits_js_url(&self, url: &str) -> bool {
        let config = self.config.snapshot();
        if !self.enabled_with(&config) {
            return true;
        }

        let unescaped = self.detector.unescape_loop(url);
        tracing::trace!(target: "xss", "JS URL: {}", snippet(&unescaped, LOG_SNIPPET_CHARS));

        let findings = self.detector.check_inline(&unescaped, self.parameters());
        self.verdict(PolicyKind::JsUrl, url, &config, &findings)
    }

    /// Check an inline event handler before it is attached.
    pub fn permits_event_listener(&self, script: &str) -> bool {
        self.check_inline(PolicyKind::EventListener, script, script, LOG_SNIPPET_CHARS)
    }

    /// Check a `<base>` element before it changes the document base URL.
    ///
    /// Moving the base within the same registrable domain is always allowed.
    pub fn permits_base_element(&self, old_uri: Option<&Url>, new_uri: Option<&Url>) -> bool {
        let (Some(old_uri), Some(new_uri)) = (old_uri, new_uri) else {
            return true;
        };

        let config = self.config.snapshot();
        if !self.enabled_with(&config) {
            return true;
        }

        tracing::trace!(target: "xss", "Base element: {}", new_uri);
        if self.detector.domain(old_uri) == self.detector.domain(new_uri) {
            return true;
        }

        let findings = self
            .detector
            .check_external(new_uri, &self.document_uri, self.parameters());
        self.verdict(PolicyKind::BaseElement, new_uri.as_str(), &config, &findings)
    }

    /// Check an `<object>` or `<embed>` resource before it is fetched.
    pub fn permits_external_object(&mut self, uri: Option<&Url>) -> bool {
        let Some(uri) = uri else {
            return true;
        };

        let config = self.config.snapshot();
        if !self.enabled_with(&config) {
            return true;
        }

        tracing::trace!(target: "xss", "Object: {}", uri);
        self.check_external_cached(PolicyKind::Object, uri, &config)
    }

    /// Check a `data:` URL before it is used.
    pub fn permits_data_url(&self, uri: Option<&Url>) -> bool {
        let Some(uri) = uri else {
            return true;
        };
        let serialized = uri.as_str();
        self.check_inline(PolicyKind::DataUrl, serialized, serialized, LOG_SNIPPET_CHARS)
    }

    /// Check code passed to the script engine directly, e.g. through `eval`
    /// or a string timer.
    pub fn permits_js_action(&self, code: &str) -> bool {
        self.check_inline(PolicyKind::JsAction, code, code, LOG_CODE_SNIPPET_CHARS)
    }

    /// Apply an `X-XSS-Protection` value from a `<meta http-equiv>` element.
    ///
    /// Only `1; mode=block` has an effect: it turns block mode on. A meta
    /// element cannot disable the filter or turn block mode off.
    pub fn apply_http_equiv(&mut self, value: &str) {
        let policy = HeaderPolicy::parse_with(Some(value), HeaderSource::HttpEquivMeta);
        if policy.block_mode && !self.meta_block_mode {
            tracing::debug!(target: "xss", "Block mode activated by meta element on {}", self.document_uri);
            self.meta_block_mode = true;
        }
    }

    /// Whether the filter runs for this document.
    pub fn is_enabled(&self) -> bool {
        self.enabled_with(&self.config.snapshot())
    }

    /// Whether violations cancel the load.
    pub fn is_block_mode(&self) -> bool {
        self.block_mode_with(&self.config.snapshot())
    }

    /// Whether violations are only reported.
    pub fn is_report_only(&self) -> bool {
        self.config.snapshot().report_only
    }

    /// The policy announced by the response header, parsed on first use.
    pub fn header_policy(&self) -> HeaderPolicy {
        *self.header.get_or_init(|| self.scan_response_header())
    }

    /// Request parameters, gathered on first use.
    pub fn parameters(&self) -> &ParameterSet {
        self.params.get_or_init(|| {
            let channel = self.channel.as_deref();
            extract_parameters(&self.document_uri, channel, self.detector.as_ref())
        })
    }

    /// Verdicts recorded for external resources so far.
    pub fn domain_cache(&self) -> &DomainVerdictCache {
        &self.domain_cache
    }

    /// The document's current URI.
    pub fn document_uri(&self) -> &Url {
        &self.document_uri
    }

    /// Record a new document URI, e.g. after `history.pushState`. Parameters
    /// already gathered are kept.
    pub fn set_document_uri(&mut self, uri: Url) {
        self.document_uri = uri;
    }

    fn scan_response_header(&self) -> HeaderPolicy {
        let Some(channel) = &self.channel else {
            tracing::debug!(target: "xss", "No channel for {}, filter stays enabled", self.document_uri);
            return HeaderPolicy::DEFAULT;
        };

        let value = channel.response_header(X_XSS_PROTECTION);
        tracing::trace!(target: "xss", "Header: {:?}", value);

        let policy = HeaderPolicy::parse(value.as_deref());
        if !policy.enabled {
            tracing::debug!(target: "xss", "Filter disabled by {} for {}", X_XSS_PROTECTION, self.document_uri);
        } else if policy.block_mode {
            tracing::debug!(target: "xss", "Block mode activated for {}", self.document_uri);
        }
        policy
    }

    fn enabled_with(&self, config: &FilterConfig) -> bool {
        config.filter_enabled && self.header_policy().enabled
    }

    fn block_mode_with(&self, config: &FilterConfig) -> bool {
        config.block_mode || self.header_policy().block_mode || self.meta_block_mode
    }

    fn check_inline(&self, policy: PolicyKind, content: &str, reported: &str, log_chars: usize) -> bool {
        let config = self.config.snapshot();
        if !self.enabled_with(&config) {
            return true;
        }

        tracing::trace!(target: "xss", "{}: {}", policy, snippet(content, log_chars));

        let findings = self.detector.check_inline(content, self.parameters());
        self.verdict(policy, reported, &config, &findings)
    }

    fn check_external_cached(&mut self, policy: PolicyKind, uri: &Url, config: &FilterConfig) -> bool {
        let domain = self.detector.domain(uri);
        if let Some(permitted) = self.domain_cache.get(&domain) {
            tracing::trace!(target: "xss", "Cached verdict for {}: {}", domain, permitted);
            return permitted;
        }

        let findings = self
            .detector
            .check_external(uri, &self.document_uri, self.parameters());
        let attack = self.detector.has_attack(&findings);
        self.domain_cache.put(domain, !attack);

        if attack {
            self.notify_violation(policy, uri.as_str(), config, &findings);
            return config.report_only;
        }
        true
    }

    fn verdict(&self, policy: PolicyKind, reported: &str, config: &FilterConfig, findings: &Findings) -> bool {
        if self.detector.has_attack(findings) {
            self.notify_violation(policy, reported, config, findings);
            return config.report_only;
        }
        true
    }

    fn notify_violation(&self, policy: PolicyKind, content: &str, config: &FilterConfig, findings: &Findings) {
        tracing::debug!(target: "xss", "Reflected parameters {:?} in {}", findings.matched(), policy);

        let violation = Violation {
            policy,
            content: content.to_string(),
            uri: self.document_uri.clone(),
            report_only: config.report_only,
            block_mode: self.block_mode_with(config),
        };
        self.reporter.report(&violation, self.channel.as_deref());
    }
}

impl fmt::Debug for XssFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XssFilter")
            .field("document_uri", &self.document_uri.as_str())
            .field("header", &self.header.get())
            .field("meta_block_mode", &self.meta_block_mode)
            .field("params", &self.params.get().map(ParameterSet::len))
            .field("cached_domains", &self.domain_cache.len())
            .finish_non_exhaustive()
    }
}

/// At most `max_chars` characters of `s`.
fn snippet(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
