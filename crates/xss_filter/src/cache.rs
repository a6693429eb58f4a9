//! Per-page verdict cache for external resources.
//!
//! Pages tend to load many scripts and plugins from a handful of domains.
//! Once one resource from a registrable domain has been checked, the answer
//! is reused for every other resource from that domain on the same page.
//! Entries are never evicted; the number of distinct domains one page
//! references keeps the map small.

use std::collections::HashMap;

/// Registrable domain to permit/deny verdict.
#[derive(Clone, Debug, Default)]
pub struct DomainVerdictCache {
    verdicts: HashMap<String, bool>,
}

impl DomainVerdictCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached verdict for `domain`.
    pub fn get(&self, domain: &str) -> Option<bool> {
        self.verdicts.get(domain).copied()
    }

    /// Record the verdict for `domain`.
    pub fn put(&mut self, domain: impl Into<String>, verdict: bool) {
        self.verdicts.insert(domain.into(), verdict);
    }

    /// Number of domains with a verdict.
    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    /// Check if no verdict has been recorded.
    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}
