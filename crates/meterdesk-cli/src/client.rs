//! Shared context, error types, and argument parsers for the CLI.

use std::fmt::{self, Display, Formatter};

use anyhow::anyhow;
use meterdesk_client::{ApiClient, ClientError};
use meterdesk_config::{ClientConfig, ConfigError};
use meterdesk_core::{CoreError, FetchError, ListError, SortDirection};

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ClientError> for CliError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::TransitionRefused { .. } => Self::validation(error.to_string()),
            ClientError::Fetch(fetch) => fetch.into(),
            other => Self::failure(other),
        }
    }
}

impl From<FetchError> for CliError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Status {
                status: 400 | 409 | 422,
                message,
            } => Self::validation(message),
            other => Self::failure(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        Self::validation(format!("{:#}", anyhow::Error::from(error)))
    }
}

impl From<CoreError> for CliError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Closed => Self::failure(error),
            other => Self::validation(other.to_string()),
        }
    }
}

/// Map a list screen's failure to the message shown to the operator.
pub(crate) fn list_failure(error: &ListError) -> CliError {
    CliError::failure(anyhow!(error.notice()))
}

/// Application context passed to command handlers.
#[derive(Debug, Clone)]
pub(crate) struct AppContext {
    pub(crate) client: ApiClient,
    pub(crate) config: ClientConfig,
}

#[cfg(test)]
impl AppContext {
    /// Context pointed at a mock server with a short search debounce.
    pub(crate) fn for_tests(base_url: &str) -> Self {
        let mut config = ClientConfig {
            api_url: base_url.to_string(),
            ..ClientConfig::default()
        };
        config.list.debounce_ms = 20;
        config.reports.poll_interval_ms = 100;
        let client = ApiClient::new(&meterdesk_client::ClientSettings {
            base_url: base_url.to_string(),
            ..meterdesk_client::ClientSettings::default()
        })
        .expect("client");
        Self { client, config }
    }
}

/// Parse a `key=value` pair.
pub(crate) fn parse_key_value(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{input}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{input}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Parse `field` or `field:asc|desc`; the direction defaults to ascending.
pub(crate) fn parse_sort(input: &str) -> Result<(String, SortDirection), String> {
    let (field, direction) = match input.split_once(':') {
        Some((field, direction)) => (
            field.trim(),
            direction
                .parse::<SortDirection>()
                .map_err(|err| err.to_string())?,
        ),
        None => (input.trim(), SortDirection::Ascending),
    };
    if field.is_empty() {
        return Err(format!("missing sort field in '{input}'"));
    }
    Ok((field.to_string(), direction))
}
