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

//! REST transport for the Meterdesk billing API.
//!
//! Layout:
//! - `transport.rs`: cookie-carrying HTTP client, URL joining, problem classification
//! - `endpoint.rs`: per-endpoint query parameter conventions
//! - `rest.rs`: list and detail sources for the core controllers
//! - `reports.rs`: report job creation and status
//! - `adjustments.rs`: meter reading adjustment decisions
//! - `screens.rs`: catalogue of list screens
//! - `error.rs`: client error type

pub mod adjustments;
pub mod endpoint;
pub mod error;
pub mod reports;
pub mod rest;
pub mod screens;
pub mod transport;

pub use adjustments::AdjustmentClient;
pub use endpoint::{EndpointSpec, PageBase, ParamNames};
pub use error::{ClientError, ClientResult};
pub use reports::RestReportSource;
pub use rest::RestSource;
pub use screens::Screen;
pub use transport::{ApiClient, ClientSettings, classify_problem};
