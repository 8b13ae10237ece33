//! Layered configuration loading.
//!
//! # Design
//! - Precedence is defaults, then the JSON file, then `METERDESK_*` variables.
//! - The environment lookup is injectable so callers and tests need not
//!   mutate process state.
//! - Validation runs once over the merged result.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::ClientConfig;
use crate::validate::validate;

/// Variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "METERDESK_CONFIG";

const API_URL_ENV: &str = "METERDESK_API_URL";
const TIMEOUT_ENV: &str = "METERDESK_HTTP_TIMEOUT_SECS";
const SESSION_COOKIE_ENV: &str = "METERDESK_SESSION_COOKIE";
const DEBOUNCE_ENV: &str = "METERDESK_DEBOUNCE_MS";
const PAGE_SIZE_ENV: &str = "METERDESK_PAGE_SIZE";
const POLL_INTERVAL_ENV: &str = "METERDESK_POLL_INTERVAL_MS";
const LOG_LEVEL_ENV: &str = "METERDESK_LOG_LEVEL";
const LOG_FORMAT_ENV: &str = "METERDESK_LOG_FORMAT";

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds a [`ClientConfig`] from defaults, an optional file, and the
/// environment.
pub struct ConfigLoader {
    path: Option<PathBuf>,
    env: EnvLookup,
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ConfigLoader")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::with_env(|key| std::env::var(key).ok())
    }
}

impl ConfigLoader {
    /// Loader reading the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader reading variables through `lookup`.
    #[must_use]
    pub fn with_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            path: None,
            env: Box::new(lookup),
        }
    }

    /// Read `path` instead of the file named by `METERDESK_CONFIG`.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Merge every layer and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`] when the file
    /// cannot be used and [`ConfigError::InvalidField`] when a value is out of
    /// range or an override does not parse.
    pub fn load(&self) -> ConfigResult<ClientConfig> {
        let path = self
            .path
            .clone()
            .or_else(|| self.var(CONFIG_PATH_ENV).map(PathBuf::from));
        let mut config = match path {
            Some(path) => read_file(&path)?,
            None => ClientConfig::default(),
        };
        self.apply_env(&mut config)?;
        validate(&config)?;
        Ok(config)
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.env)(key).filter(|value| !value.trim().is_empty())
    }

    fn apply_env(&self, config: &mut ClientConfig) -> ConfigResult<()> {
        if let Some(url) = self.var(API_URL_ENV) {
            config.api_url = url;
        }
        if let Some(timeout) = self.parsed(TIMEOUT_ENV)? {
            config.timeout_secs = timeout;
        }
        if let Some(cookie) = self.var(SESSION_COOKIE_ENV) {
            config.session_cookie = Some(cookie);
        }
        if let Some(debounce) = self.parsed(DEBOUNCE_ENV)? {
            config.list.debounce_ms = debounce;
        }
        if let Some(page_size) = self.parsed(PAGE_SIZE_ENV)? {
            config.list.page_size = page_size;
        }
        if let Some(interval) = self.parsed(POLL_INTERVAL_ENV)? {
            config.reports.poll_interval_ms = interval;
        }
        if let Some(level) = self.var(LOG_LEVEL_ENV) {
            config.log.level = level;
        }
        if let Some(format) = self.var(LOG_FORMAT_ENV) {
            config.log.format = Some(format.trim().to_ascii_lowercase());
        }
        Ok(())
    }

    fn parsed<T: FromStr>(&self, key: &'static str) -> ConfigResult<Option<T>> {
        self.var(key)
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::invalid(key, Some(raw), "expected an unsigned integer"))
            })
            .transpose()
    }
}

fn read_file(path: &Path) -> ConfigResult<ClientConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded configuration file");
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn loader(vars: &[(&str, &str)]) -> ConfigLoader {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        ConfigLoader::with_env(move |key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = loader(&[]).load().expect("defaults");
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn environment_overrides_apply() {
        let config = loader(&[
            (API_URL_ENV, "https://billing.example"),
            (PAGE_SIZE_ENV, "100"),
            (DEBOUNCE_ENV, " 250 "),
            (LOG_FORMAT_ENV, "JSON"),
        ])
        .load()
        .expect("config");
        assert_eq!(config.api_url, "https://billing.example");
        assert_eq!(config.list.page_size, 100);
        assert_eq!(config.list.debounce_ms, 250);
        assert_eq!(config.log.format.as_deref(), Some("json"));
    }

    #[test]
    fn blank_variables_are_ignored() {
        let config = loader(&[(SESSION_COOKIE_ENV, "  ")]).load().expect("config");
        assert!(config.session_cookie.is_none());
    }

    #[test]
    fn unparsable_override_names_the_variable() {
        let err = loader(&[(TIMEOUT_ENV, "ten")]).load().expect_err("invalid");
        match err {
            ConfigError::InvalidField { field, value, .. } => {
                assert_eq!(field, TIMEOUT_ENV);
                assert_eq!(value.as_deref(), Some("ten"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = loader(&[(CONFIG_PATH_ENV, "/nonexistent/meterdesk.json")])
            .load()
            .expect_err("missing");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
