//! Error types for telemetry setup.

use thiserror::Error;

/// Errors raised while installing logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {message}")]
    SubscriberInstall {
        /// Reason reported by `tracing-subscriber`.
        message: String,
    },
}

/// Convenience result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
