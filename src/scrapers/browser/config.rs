//! Browser engine and load-more configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Browser engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false to watch the load-more clicks happen.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Timeout in seconds for each browser call (navigation, lookups, clicks).
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}

pub fn default_headless() -> bool {
    true
}

pub fn default_timeout() -> u64 {
    30
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            proxy: None,
            timeout: default_timeout(),
            chrome_args: Vec::new(),
            remote_url: None,
        }
    }
}

/// Settings for driving "load more" pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadMoreConfig {
    /// The control that renders the next batch of cards.
    pub control_selector: String,
    /// Cookie banner button; dismissed once if present.
    pub consent_selector: String,
    /// Style value the control reports once the catalog is exhausted.
    pub hidden_style: String,
    /// Wait after navigation for the first client-side render.
    pub settle_delay_ms: u64,
    /// Wait before each visibility check.
    pub poll_delay_ms: u64,
    /// Upper bound on load-more activations per page.
    pub max_clicks: u32,
    /// Upper bound on time spent expanding one page.
    pub max_duration_secs: u64,
}

impl Default for LoadMoreConfig {
    fn default() -> Self {
        Self {
            control_selector: ".ecomerce-items-scroll-more".to_string(),
            consent_selector: ".acceptCookies".to_string(),
            hidden_style: "display: none".to_string(),
            settle_delay_ms: 1000,
            poll_delay_ms: 500,
            max_clicks: 100,
            max_duration_secs: 180,
        }
    }
}

impl LoadMoreConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}
