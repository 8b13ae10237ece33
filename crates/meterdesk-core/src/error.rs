//! Error taxonomy for remote reads and controller operations.

use thiserror::Error;

/// Failure reported by a remote source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The session lacks permission for the resource (HTTP 403).
    #[error("permission denied")]
    PermissionDenied {
        /// Server-provided detail, kept for diagnostics only.
        message: Option<String>,
    },
    /// The request never produced a response.
    #[error("request failed: {message}")]
    Transport {
        /// Transport error description.
        message: String,
    },
    /// The server answered with a non-success status.
    #[error("server returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Problem detail or body excerpt.
        message: String,
    },
    /// The response body did not match the expected envelope.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Decoder error description.
        message: String,
    },
}

impl FetchError {
    /// Classify a non-success HTTP status; 403 maps to [`FetchError::PermissionDenied`].
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 403 {
            Self::PermissionDenied {
                message: (!message.is_empty()).then_some(message),
            }
        } else {
            Self::Status { status, message }
        }
    }

    /// Wrap a transport failure.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Wrap a decoding failure.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Whether this failure is an authorization denial.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Error state published by list and detail views.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    /// Replaces the whole view with an access-denied notice.
    #[error("access denied")]
    PermissionDenied {
        /// Permission names required by the screen.
        required: Vec<String>,
    },
    /// Retryable failure shown inline with an empty grid.
    #[error("{message}")]
    Failed {
        /// User-facing failure message.
        message: String,
    },
}

impl ListError {
    /// Map a fetch failure into view state for a screen requiring `required`.
    #[must_use]
    pub fn from_fetch(error: &FetchError, required: &[String]) -> Self {
        if error.is_permission_denied() {
            Self::PermissionDenied {
                required: required.to_vec(),
            }
        } else {
            Self::Failed {
                message: error.to_string(),
            }
        }
    }

    /// Human-readable notice, naming required permissions for denials.
    #[must_use]
    pub fn notice(&self) -> String {
        match self {
            Self::PermissionDenied { required } if required.is_empty() => {
                "Access denied".to_string()
            }
            Self::PermissionDenied { required } => {
                format!("Access denied: requires {}", required.join(", "))
            }
            Self::Failed { message } => message.clone(),
        }
    }
}

/// Errors raised by controller operations themselves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Page size must be positive.
    #[error("page size must be greater than zero")]
    InvalidPageSize,
    /// Sort direction label was not recognised.
    #[error("invalid sort direction '{value}'")]
    InvalidSortDirection {
        /// Offending label.
        value: String,
    },
    /// Adjustment status label was not recognised.
    #[error("invalid adjustment status '{value}'")]
    InvalidAdjustmentStatus {
        /// Offending label.
        value: String,
    },
    /// A watched channel closed before the awaited state was reached.
    #[error("controller was dropped")]
    Closed,
}

/// Convenience alias for controller operations.
pub type CoreResult<T> = Result<T, CoreError>;
