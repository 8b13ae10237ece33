//! Default values and validation limits.
//!
//! # Design
//! - Keep every default in one place so the model and validation agree.

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
/// Per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Quiet period applied to search edits.
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;
/// Rows requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 25;
/// Largest page size the API accepts.
pub const MAX_PAGE_SIZE: u32 = 500;
/// Report job status poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
/// Shortest poll interval accepted.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;
/// Fallback log level when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";
