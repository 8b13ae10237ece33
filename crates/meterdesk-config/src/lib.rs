#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

//! Client configuration for Meterdesk.
//!
//! Layout:
//! - `model.rs`: configuration document types
//! - `defaults.rs`: default values and limits
//! - `loader.rs`: file and environment layering
//! - `validate.rs`: field validation
//! - `error.rs`: configuration error type

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_PATH_ENV, ConfigLoader};
pub use model::{ClientConfig, ListConfig, LogConfig, ReportsConfig};
