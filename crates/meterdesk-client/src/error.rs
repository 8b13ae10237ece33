//! Error types for the REST client.

use meterdesk_core::{AdjustmentStatus, FetchError};
use thiserror::Error;

/// Failures raised while building or using the REST client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured base URL could not be parsed or joined.
    #[error("invalid API URL '{url}'")]
    InvalidUrl {
        /// Offending URL or path.
        url: String,
        /// Underlying parser error.
        #[source]
        source: url::ParseError,
    },
    /// A configured header value contained characters HTTP does not allow.
    #[error("invalid value for header '{name}'")]
    InvalidHeader {
        /// Header name.
        name: &'static str,
    },
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),
    /// A request reached the server (or failed to) and did not succeed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The adjustment is already decided; the transition was not submitted.
    #[error("adjustment is {} and cannot become {}", .from.as_str(), .to.as_str())]
    TransitionRefused {
        /// Known current status.
        from: AdjustmentStatus,
        /// Requested status.
        to: AdjustmentStatus,
    },
}

impl ClientError {
    /// Whether the server denied access to the resource.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Fetch(err) if err.is_permission_denied())
    }
}

/// Convenience alias for client results.
pub type ClientResult<T> = Result<T, ClientError>;
