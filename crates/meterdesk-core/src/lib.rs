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

//! Core state machinery for Meterdesk list screens.
//!
//! Layout:
//! - `model.rs`: rows, queries, page results, report jobs, adjustment states
//! - `filters.rs`: parent/child filter dependency chains
//! - `query.rs`: pure query transformations (page resets, clamping)
//! - `source.rs`: async traits implemented by transports
//! - `list.rs`: the remote list controller (debounce, last-query-wins fetch)
//! - `detail.rs`: independent single-record fetch with toggle semantics
//! - `reports.rs`: fixed-interval report job poller
//! - `view.rs`: published view snapshots

pub mod detail;
pub mod error;
pub mod filters;
pub mod list;
pub mod model;
pub mod query;
pub mod reports;
pub mod source;
pub mod view;

pub use detail::{DetailController, Selection};
pub use error::{CoreError, CoreResult, FetchError, ListError};
pub use filters::FilterDependencies;
pub use list::{DEFAULT_DEBOUNCE, DEFAULT_PAGE_SIZE, ListController, ListOptions};
pub use model::{
    AdjustmentStatus, FilterValue, JobId, PageResult, Query, ReportJob, ReportRequest,
    ReportStatus, Row, RowId, Sort, SortDirection,
};
pub use reports::{DEFAULT_POLL_INTERVAL, ReportPoller};
pub use source::{DetailSource, ListSource, ReportJobSource};
pub use view::{DetailView, ListView};
