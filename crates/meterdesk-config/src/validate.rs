//! Validation helpers for configuration documents.

use url::Url;

use crate::defaults::{MAX_PAGE_SIZE, MIN_POLL_INTERVAL_MS};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{ClientConfig, LogConfig};

/// Check every field of `config`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first field out of range.
pub fn validate(config: &ClientConfig) -> ConfigResult<()> {
    parse_api_url(&config.api_url)?;
    if config.timeout_secs == 0 {
        return Err(ConfigError::invalid(
            "timeout_secs",
            Some("0".into()),
            "must be greater than zero",
        ));
    }
    validate_page_size(config.list.page_size)?;
    if config.reports.poll_interval_ms < MIN_POLL_INTERVAL_MS {
        return Err(ConfigError::invalid(
            "reports.poll_interval_ms",
            Some(config.reports.poll_interval_ms.to_string()),
            "must be at least 100 milliseconds",
        ));
    }
    validate_log(&config.log)
}

/// Parse and check the API base URL.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when `value` is not an absolute
/// `http` or `https` URL.
pub fn parse_api_url(value: &str) -> ConfigResult<Url> {
    let url = Url::parse(value)
        .map_err(|_| ConfigError::invalid("api_url", Some(value.to_string()), "not a URL"))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(ConfigError::invalid(
            "api_url",
            Some(value.to_string()),
            "must be an http or https URL",
        )),
    }
}

fn validate_page_size(page_size: u32) -> ConfigResult<()> {
    if (1..=MAX_PAGE_SIZE).contains(&page_size) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            "list.page_size",
            Some(page_size.to_string()),
            "must be between 1 and 500",
        ))
    }
}

fn validate_log(log: &LogConfig) -> ConfigResult<()> {
    if log.level.trim().is_empty() {
        return Err(ConfigError::invalid(
            "log.level",
            None,
            "must not be empty",
        ));
    }
    match log.format.as_deref() {
        None | Some("json" | "pretty") => Ok(()),
        Some(other) => Err(ConfigError::invalid(
            "log.format",
            Some(other.to_string()),
            "must be 'json' or 'pretty'",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::InvalidField { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        validate(&ClientConfig::default()).expect("defaults validate");
    }

    #[test]
    fn api_url_requires_http_scheme() {
        assert!(parse_api_url("https://billing.example/api").is_ok());
        assert_eq!(field_of(parse_api_url("ftp://billing.example").expect_err("ftp")), "api_url");
        assert_eq!(field_of(parse_api_url("billing.example").expect_err("relative")), "api_url");
    }

    #[test]
    fn page_size_bounds_are_enforced() {
        let mut config = ClientConfig::default();
        config.list.page_size = 0;
        assert_eq!(field_of(validate(&config).expect_err("zero")), "list.page_size");
        config.list.page_size = MAX_PAGE_SIZE + 1;
        assert_eq!(field_of(validate(&config).expect_err("too large")), "list.page_size");
        config.list.page_size = MAX_PAGE_SIZE;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn timeout_and_poll_interval_have_floors() {
        let mut config = ClientConfig::default();
        config.timeout_secs = 0;
        assert_eq!(field_of(validate(&config).expect_err("timeout")), "timeout_secs");

        let mut config = ClientConfig::default();
        config.reports.poll_interval_ms = 50;
        assert_eq!(
            field_of(validate(&config).expect_err("poll")),
            "reports.poll_interval_ms"
        );
    }

    #[test]
    fn log_format_must_be_known() {
        let mut config = ClientConfig::default();
        config.log.format = Some("xml".into());
        assert_eq!(field_of(validate(&config).expect_err("format")), "log.format");
    }
}
