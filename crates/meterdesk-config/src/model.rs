//! Configuration document types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_API_URL, DEFAULT_DEBOUNCE_MS, DEFAULT_LOG_LEVEL, DEFAULT_PAGE_SIZE,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_SECS,
};

/// Fully layered client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the billing API.
    pub api_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Session cookie sent with every request.
    pub session_cookie: Option<String>,
    /// List screen behaviour.
    pub list: ListConfig,
    /// Report job polling.
    pub reports: ReportsConfig,
    /// Logging output.
    pub log: LogConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            session_cookie: None,
            list: ListConfig::default(),
            reports: ReportsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Search debounce as a [`Duration`].
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.list.debounce_ms)
    }

    /// Report poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.reports.poll_interval_ms)
    }
}

/// List screen settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListConfig {
    /// Quiet period after the last search edit, in milliseconds.
    pub debounce_ms: u64,
    /// Rows per page.
    pub page_size: u32,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Report job settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportsConfig {
    /// Status poll interval, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// `json` or `pretty`; inferred from the build profile when absent.
    pub format: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: None,
        }
    }
}
