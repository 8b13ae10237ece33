//! Snapshots published to renderers after every state transition.

use serde_json::Value;

use crate::error::ListError;
use crate::model::{PageResult, Query, RowId};

/// Current state of a list screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    /// Query the page (or pending fetch) belongs to.
    pub query: Query,
    /// Rows from the most recent accepted fetch.
    pub page: PageResult,
    /// True while the current generation's fetch is outstanding.
    pub loading: bool,
    /// Failure from the most recent accepted fetch.
    pub error: Option<ListError>,
    /// Generation of the query this view reflects; zero before the first fetch.
    pub generation: u64,
}

impl ListView {
    /// Initial view before anything has been fetched.
    #[must_use]
    pub const fn idle(query: Query) -> Self {
        Self {
            query,
            page: PageResult::empty(),
            loading: false,
            error: None,
            generation: 0,
        }
    }

    /// Whether the screen must show the access-denied notice instead of the grid.
    #[must_use]
    pub const fn is_access_denied(&self) -> bool {
        matches!(self.error, Some(ListError::PermissionDenied { .. }))
    }

    /// Whether at least one fetch was issued and none is outstanding.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.generation > 0 && !self.loading
    }

    /// Page count at the query's page size.
    #[must_use]
    pub fn page_count(&self) -> u64 {
        self.page.page_count(self.query.page_size)
    }
}

/// Current state of the detail panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailView {
    /// Row whose panel is open.
    pub selected: Option<RowId>,
    /// Fetched record for `selected`.
    pub record: Option<Value>,
    /// True while the record for `selected` is being fetched.
    pub loading: bool,
    /// Failure message for the current selection.
    pub error: Option<String>,
}

impl DetailView {
    /// Whether a panel is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.selected.is_some()
    }

    /// Whether the open panel has finished loading (successfully or not).
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.selected.is_some() && !self.loading
    }
}
