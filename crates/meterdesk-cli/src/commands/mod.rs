//! Command handlers grouped by concern.

pub(crate) mod adjustments;
pub(crate) mod browse;
pub(crate) mod list;
pub(crate) mod reports;
