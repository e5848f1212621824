//! Enhancement Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Query parameter that turns on diagnostic logging
pub const DEBUG_QUERY_PARAM: &str = "civic-debug";

/// Storage key that turns on diagnostic logging
pub const DEBUG_STORAGE_KEY: &str = "civic:debug";

/// Named delays, in milliseconds.
///
/// The host finishes its own asynchronous setup at unobservable times;
/// these are the waits taken before acting on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delays {
    /// Connect → classification. Zero still yields one macrotask.
    pub classify_ms: u64,
    /// Default wait before the iframe guard inspects a component
    pub guard_ms: u64,
    /// Frame cadence used for next-paint callbacks
    pub frame_ms: u64,
}

impl Delays {
    pub fn classify(&self) -> Duration {
        Duration::from_millis(self.classify_ms)
    }

    pub fn guard(&self) -> Duration {
        Duration::from_millis(self.guard_ms)
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            classify_ms: 0,
            guard_ms: 100,
            frame_ms: 16,
        }
    }
}

/// Enhancement configuration options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub delays: Delays,

    /// Log classification and registry state
    pub debug: bool,

    /// Hold connected nodes until the host calls `Page::signal_ready`
    pub defer_until_ready: bool,

    /// Override frame isolation detection
    pub force_isolation: Option<bool>,

    /// Extra tags treated as known static
    pub extra_static: Vec<String>,

    /// Extra tags treated as known interactive
    pub extra_interactive: Vec<String>,
}

impl Config {
    /// Defaults plus the debug flag from the page URL query string
    pub fn from_url(url: &str) -> Self {
        let mut config = Self::default();
        match Url::parse(url) {
            Ok(parsed) => config.apply_query(&parsed),
            Err(err) => tracing::debug!(%url, %err, "unparseable page url, using defaults"),
        }
        config
    }

    /// Turn on debugging when `?civic-debug` is present and not false
    pub fn apply_query(&mut self, url: &Url) {
        if let Some((_, value)) = url.query_pairs().find(|(k, _)| k == DEBUG_QUERY_PARAM) {
            self.debug |= flag_enabled(&value);
        }
    }

    /// Apply the value stored under [`DEBUG_STORAGE_KEY`], if any
    pub fn apply_storage_flag(&mut self, value: Option<&str>) {
        if let Some(value) = value {
            self.debug |= flag_enabled(value);
        }
    }
}

fn flag_enabled(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.debug);
        assert_eq!(config.delays.classify(), Duration::ZERO);
        assert_eq!(config.delays.guard(), Duration::from_millis(100));
    }

    #[test]
    fn test_debug_from_query() {
        assert!(Config::from_url("https://designsystem.digital.gov/?civic-debug").debug);
        assert!(Config::from_url("https://designsystem.digital.gov/?a=1&civic-debug=true").debug);
        assert!(!Config::from_url("https://designsystem.digital.gov/?civic-debug=0").debug);
        assert!(!Config::from_url("https://designsystem.digital.gov/").debug);
        assert!(!Config::from_url("not a url").debug);
    }

    #[test]
    fn test_storage_flag() {
        let mut config = Config::default();
        config.apply_storage_flag(None);
        assert!(!config.debug);
        config.apply_storage_flag(Some("off"));
        assert!(!config.debug);
        config.apply_storage_flag(Some("1"));
        assert!(config.debug);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config = serde_json::from_str(
            r#"{ "delays": { "guard_ms": 250 }, "extra_static": ["my-badge"] }"#,
        ).unwrap();
        assert_eq!(config.delays.guard_ms, 250);
        assert_eq!(config.delays.frame_ms, 16);
        assert_eq!(config.extra_static, vec!["my-badge".to_string()]);
        assert_eq!(config.force_isolation, None);
    }
}
