//! Reflected XSS filter.
//!
//! This crate decides, per document, whether script-bearing content may run:
//! - `X-XSS-Protection` header and `<meta http-equiv>` policy parsing
//! - Request parameter extraction from the query string and POST body
//! - Per-page, per-domain verdict caching for external resources
//! - Permission checks for inline scripts, external scripts, `javascript:`
//!   and `data:` URLs, event handlers, `<base>`, plugins and direct JS calls
//! - Violation reporting to the console, observers and the load channel
//!
//! The reflection heuristic itself is pluggable through [`Detector`].

pub mod cache;
pub mod config;
pub mod detector;
pub mod error;
pub mod filter;
pub mod header;
pub mod observer;
pub mod params;
pub mod report;

pub use cache::DomainVerdictCache;
pub use config::{FilterConfig, SharedConfig};
pub use detector::{registrable_domain, unescape_loop, Detector, Findings};
pub use error::{ConfigError, ExtractionError};
pub use filter::XssFilter;
pub use header::{HeaderPolicy, HeaderSource};
pub use observer::{
    notification_queue, NotificationSender, Observer, ObserverService, ViolationNotification,
    VIOLATION_TOPIC,
};
pub use params::{extract_parameters, Parameter, ParameterSet};
pub use report::{Console, ConsoleBuffer, PolicyKind, TracingConsole, Violation, ViolationReporter};
