//! Global filter configuration.
//!
//! The flags live in the preference store and may change at any time. The
//! filter never writes them; it reads a snapshot at the start of every check.

use crate::error::ConfigError;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;

/// Preference key for [`FilterConfig::filter_enabled`].
pub const PREF_ENABLE: &str = "security.xssfilter.enable";
/// Preference key for [`FilterConfig::report_only`].
pub const PREF_REPORT_ONLY: &str = "security.xssfilter.reportOnly";
/// Preference key for [`FilterConfig::block_mode`].
pub const PREF_BLOCK_MODE: &str = "security.xssfilter.blockMode";
/// Preference key for [`FilterConfig::block_dynamic_scripts`].
pub const PREF_BLOCK_DYNAMIC: &str = "security.xssfilter.blockDynamic";

/// Process-wide XSS filter flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Master switch.
    #[serde(rename = "security.xssfilter.enable")]
    pub filter_enabled: bool,
    /// Record violations without ever denying an operation.
    #[serde(rename = "security.xssfilter.reportOnly")]
    pub report_only: bool,
    /// Cancel the load on every violation, whatever the page asked for.
    #[serde(rename = "security.xssfilter.blockMode")]
    pub block_mode: bool,
    /// Also check scripts inserted by other scripts.
    #[serde(rename = "security.xssfilter.blockDynamic")]
    pub block_dynamic_scripts: bool,
}

impl FilterConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON preference object. Unknown keys are ignored and
    /// missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build from `(key, value)` preference pairs.
    pub fn from_prefs<'a>(prefs: impl IntoIterator<Item = (&'a str, bool)>) -> Self {
        let mut config = Self::default();
        for (key, value) in prefs {
            match key {
                PREF_ENABLE => config.filter_enabled = value,
                PREF_REPORT_ONLY => config.report_only = value,
                PREF_BLOCK_MODE => config.block_mode = value,
                PREF_BLOCK_DYNAMIC => config.block_dynamic_scripts = value,
                _ => tracing::trace!(target: "xss", "Ignoring preference {}", key),
            }
        }
        config
    }

    /// Set the master switch.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.filter_enabled = enabled;
        self
    }

    /// Set report-only mode.
    pub fn with_report_only(mut self, report_only: bool) -> Self {
        self.report_only = report_only;
        self
    }

    /// Set global block mode.
    pub fn with_block_mode(mut self, block_mode: bool) -> Self {
        self.block_mode = block_mode;
        self
    }

    /// Set whether dynamically inserted scripts are checked.
    pub fn with_block_dynamic_scripts(mut self, block: bool) -> Self {
        self.block_dynamic_scripts = block;
        self
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            filter_enabled: true,
            report_only: false,
            block_mode: false,
            block_dynamic_scripts: true,
        }
    }
}

/// Live handle to the global configuration, shared by every page.
#[derive(Clone, Debug, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<FilterConfig>>,
}

impl SharedConfig {
    /// Wrap a configuration.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Current flags.
    pub fn snapshot(&self) -> FilterConfig {
        *self.inner.read()
    }

    /// Replace the flags. Called by the preference subsystem on change.
    pub fn update(&self, config: FilterConfig) {
        tracing::debug!(target: "xss", "XSS filter configuration changed: {:?}", config);
        *self.inner.write() = config;
    }
}

impl From<FilterConfig> for SharedConfig {
    fn from(config: FilterConfig) -> Self {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FilterConfig::default();
        assert!(config.filter_enabled);
        assert!(!config.report_only);
        assert!(!config.block_mode);
        assert!(config.block_dynamic_scripts);
    }

    #[test]
    fn test_config_builder() {
        let config = FilterConfig::new()
            .with_report_only(true)
            .with_block_dynamic_scripts(false);

        assert!(config.report_only);
        assert!(!config.block_dynamic_scripts);
        assert!(config.filter_enabled);
    }

    #[test]
    fn test_from_json_uses_pref_keys() {
        let config = FilterConfig::from_json(
            r#"{
                "security.xssfilter.reportOnly": true,
                "security.xssfilter.blockMode": true,
                "browser.startup.homepage": "about:blank"
            }"#,
        )
        .unwrap();

        assert!(config.filter_enabled);
        assert!(config.report_only);
        assert!(config.block_mode);
        assert!(config.block_dynamic_scripts);
    }

    #[test]
    fn test_from_json_rejects_wrong_type() {
        let result = FilterConfig::from_json(r#"{ "security.xssfilter.enable": "yes" }"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_from_prefs() {
        let config = FilterConfig::from_prefs([(PREF_ENABLE, false), ("other.pref", true)]);
        assert!(!config.filter_enabled);
        assert_eq!(config.with_enabled(true), FilterConfig::default());
    }

    #[test]
    fn test_shared_config_update_is_visible_to_clones() {
        let shared = SharedConfig::new(FilterConfig::default());
        let page_handle = shared.clone();

        shared.update(FilterConfig::default().with_block_mode(true));

        assert!(page_handle.snapshot().block_mode);
    }
}
