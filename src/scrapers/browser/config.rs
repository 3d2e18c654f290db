//! Headless browser configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Browser settings for the dynamic pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run the dynamic pass at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Run in headless mode (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Seconds to wait for `body` after navigation.
    #[serde(default = "default_body_timeout")]
    pub body_timeout: u64,

    /// Navigation timeout in seconds.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout: u64,

    /// Pause after scrolling, for late-loading content.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_headless() -> bool {
    true
}

fn default_body_timeout() -> u64 {
    20
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_settle_delay_ms() -> u64 {
    3000
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            headless: default_headless(),
            remote_url: None,
            body_timeout: default_body_timeout(),
            navigation_timeout: default_navigation_timeout(),
            settle_delay_ms: default_settle_delay_ms(),
            chrome_args: Vec::new(),
            proxy: None,
        }
    }
}

impl BrowserEngineConfig {
    /// Apply `ANEXOS_BROWSER` and `BROWSER_URL`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("ANEXOS_BROWSER") {
            self.enabled = !matches!(
                value.trim().to_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
        if let Ok(url) = std::env::var("BROWSER_URL") {
            if !url.trim().is_empty() {
                self.remote_url = Some(url);
            }
        }
        self
    }

    pub fn body_timeout(&self) -> Duration {
        Duration::from_secs(self.body_timeout)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
