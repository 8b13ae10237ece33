//! Remote list controller: search, filters, sorting and server-side paging.
//!
//! # Design
//! - Text search is committed after a trailing quiet period; every other
//!   mutation fetches immediately.
//! - Each issued fetch bumps a generation. The previous task is aborted and a
//!   completion whose generation is no longer current is dropped, so the view
//!   always reflects the most recently issued query.
//! - Pages from endpoints without a total are never clamped or refetched.
//! - State sits behind a `std::sync::Mutex` that is never held across an
//!   `.await`; views are published through a `watch` channel.
//! - Mutators spawn Tokio tasks and must be called inside a runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{CoreResult, FetchError, ListError};
use crate::filters::FilterDependencies;
use crate::model::{FilterValue, PageResult, Query, SortDirection};
use crate::query;
use crate::source::ListSource;
use crate::view::ListView;

/// Quiet period applied to search input when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);
/// Rows per page when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Per-screen controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Trailing quiet period for search text; zero commits immediately.
    pub debounce: Duration,
    /// Initial page size.
    pub page_size: u32,
    /// Filter keys reset when their parent changes.
    pub dependencies: FilterDependencies,
    /// Permission names shown in the access-denied notice.
    pub required_permissions: Vec<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            page_size: DEFAULT_PAGE_SIZE,
            dependencies: FilterDependencies::new(),
            required_permissions: Vec::new(),
        }
    }
}

impl ListOptions {
    /// Override the search debounce.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Override the initial page size; zero is coerced to one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Replace the filter dependency configuration.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: FilterDependencies) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Replace the permissions named by the access-denied notice.
    #[must_use]
    pub fn with_required_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.required_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }
}

struct PendingSearch {
    text: String,
    seq: u64,
    handle: JoinHandle<()>,
}

struct ControllerState {
    query: Query,
    generation: u64,
    known_total: Option<u64>,
    in_flight: Option<JoinHandle<()>>,
    pending_search: Option<PendingSearch>,
    search_seq: u64,
}

struct Shared<S> {
    source: S,
    options: ListOptions,
    state: Mutex<ControllerState>,
    view_tx: watch::Sender<ListView>,
}

/// Drives one list screen against a [`ListSource`].
pub struct ListController<S: ListSource> {
    shared: Arc<Shared<S>>,
}

impl<S: ListSource> ListController<S> {
    /// Build a controller with the default query for `options`.
    #[must_use]
    pub fn new(source: S, options: ListOptions) -> Self {
        let query = Query::new(options.page_size);
        Self::with_query(source, options, query)
    }

    /// Build a controller starting from an explicit query.
    #[must_use]
    pub fn with_query(source: S, options: ListOptions, query: Query) -> Self {
        let (view_tx, _) = watch::channel(ListView::idle(query.clone()));
        let state = ControllerState {
            query,
            generation: 0,
            known_total: None,
            in_flight: None,
            pending_search: None,
            search_seq: 0,
        };
        Self {
            shared: Arc::new(Shared {
                source,
                options,
                state: Mutex::new(state),
                view_tx,
            }),
        }
    }

    /// Observe view updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ListView> {
        self.shared.view_tx.subscribe()
    }

    /// Latest published view.
    #[must_use]
    pub fn view(&self) -> ListView {
        self.shared.view_tx.borrow().clone()
    }

    /// Committed query (excludes search text still inside its quiet period).
    #[must_use]
    pub fn query(&self) -> Query {
        self.shared.lock_state().query.clone()
    }

    /// Search text waiting for its quiet period to elapse.
    #[must_use]
    pub fn pending_search(&self) -> Option<String> {
        self.shared
            .lock_state()
            .pending_search
            .as_ref()
            .map(|pending| pending.text.clone())
    }

    /// Configuration this controller was built with.
    #[must_use]
    pub fn options(&self) -> &ListOptions {
        &self.shared.options
    }

    /// Issue the first fetch; later calls are no-ops once anything was issued.
    pub fn load(&self) {
        let mut state = self.shared.lock_state();
        if state.generation == 0 {
            self.shared.fold_pending_search(&mut state);
            self.shared.issue(&mut state);
        }
    }

    /// Re-issue the current query.
    pub fn refresh(&self) {
        let mut state = self.shared.lock_state();
        self.shared.fold_pending_search(&mut state);
        self.shared.issue(&mut state);
    }

    /// Update the search text, committing it after the configured quiet period.
    pub fn set_search_text(&self, text: impl Into<String>) {
        let text = text.into();
        let mut state = self.shared.lock_state();
        if let Some(previous) = state.pending_search.take() {
            previous.handle.abort();
        }
        let debounce = self.shared.options.debounce;
        if debounce.is_zero() {
            query::apply_search(&mut state.query, text);
            state.known_total = None;
            self.shared.issue(&mut state);
            return;
        }
        state.search_seq += 1;
        let seq = state.search_seq;
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            shared.commit_search(seq);
        });
        state.pending_search = Some(PendingSearch { text, seq, handle });
    }

    /// Select a filter value; dependents of `key` are reset.
    pub fn set_filter(&self, key: impl Into<String>, value: impl Into<FilterValue>) {
        let mut state = self.shared.lock_state();
        self.shared.fold_pending_search(&mut state);
        query::apply_filter(
            &mut state.query,
            &self.shared.options.dependencies,
            key,
            value,
        );
        state.known_total = None;
        self.shared.issue(&mut state);
    }

    /// Unset a filter; dependents of `key` are reset.
    pub fn clear_filter(&self, key: &str) {
        let mut state = self.shared.lock_state();
        self.shared.fold_pending_search(&mut state);
        query::remove_filter(&mut state.query, &self.shared.options.dependencies, key);
        state.known_total = None;
        self.shared.issue(&mut state);
    }

    /// Sort by `field` in `direction`.
    pub fn set_sort(&self, field: impl Into<String>, direction: SortDirection) {
        let mut state = self.shared.lock_state();
        self.shared.fold_pending_search(&mut state);
        query::apply_sort(&mut state.query, Some((field.into(), direction)));
        self.shared.issue(&mut state);
    }

    /// Return to server-default ordering.
    pub fn clear_sort(&self) {
        let mut state = self.shared.lock_state();
        self.shared.fold_pending_search(&mut state);
        query::apply_sort(&mut state.query, None);
        self.shared.issue(&mut state);
    }

    /// Move to a zero-based page, clamped to the last known page.
    pub fn set_page(&self, index: u32) {
        let mut state = self.shared.lock_state();
        self.shared.fold_pending_search(&mut state);
        let known_total = state.known_total;
        query::apply_page(&mut state.query, index, known_total);
        self.shared.issue(&mut state);
    }

    /// Change rows per page and return to the first page.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidPageSize`] for zero; nothing is fetched.
    pub fn set_page_size(&self, size: u32) -> CoreResult<()> {
        let mut state = self.shared.lock_state();
        query::apply_page_size(&mut state.query, size)?;
        self.shared.fold_pending_search(&mut state);
        self.shared.issue(&mut state);
        Ok(())
    }
}

impl<S: ListSource> Drop for ListController<S> {
    fn drop(&mut self) {
        let mut state = self.shared.lock_state();
        if let Some(handle) = state.in_flight.take() {
            handle.abort();
        }
        if let Some(pending) = state.pending_search.take() {
            pending.handle.abort();
        }
    }
}

impl<S: ListSource> Shared<S> {
    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fold_pending_search(&self, state: &mut ControllerState) {
        if let Some(pending) = state.pending_search.take() {
            pending.handle.abort();
            debug!(search = %pending.text, "folding pending search into query");
            query::apply_search(&mut state.query, pending.text);
            state.known_total = None;
        }
    }

    fn commit_search(self: &Arc<Self>, seq: u64) {
        let mut state = self.lock_state();
        let Some(pending) = state.pending_search.take_if(|pending| pending.seq == seq) else {
            return;
        };
        query::apply_search(&mut state.query, pending.text);
        state.known_total = None;
        self.issue(&mut state);
    }

    fn issue(self: &Arc<Self>, state: &mut ControllerState) {
        state.generation += 1;
        let generation = state.generation;
        if let Some(previous) = state.in_flight.take() {
            previous.abort();
        }
        let snapshot = state.query.clone();
        debug!(
            generation,
            page = snapshot.page_index,
            page_size = snapshot.page_size,
            search = snapshot.search_term().unwrap_or_default(),
            "issuing list fetch"
        );
        let shared = Arc::clone(self);
        let request = snapshot.clone();
        state.in_flight = Some(tokio::spawn(async move {
            let outcome = shared.source.fetch_page(&request).await;
            shared.complete(generation, outcome);
        }));
        self.view_tx.send_modify(|view| {
            view.query = snapshot;
            view.loading = true;
            view.generation = generation;
        });
    }

    fn complete(self: &Arc<Self>, generation: u64, outcome: Result<PageResult, FetchError>) {
        let mut state = self.lock_state();
        if generation != state.generation {
            debug!(
                generation,
                current = state.generation,
                "discarding stale list response"
            );
            return;
        }
        state.in_flight = None;
        match outcome {
            Ok(page) => {
                let known_total = page.known_total();
                state.known_total = known_total;
                if let Some(total) =
                    known_total.filter(|&total| query::page_out_of_range(&state.query, total))
                {
                    let last = query::last_page_index(total, state.query.page_size);
                    debug!(
                        requested = state.query.page_index,
                        last, total, "page out of range; refetching last page"
                    );
                    state.query.page_index = last;
                    self.issue(&mut state);
                    return;
                }
                self.view_tx.send_modify(|view| {
                    view.page = page;
                    view.loading = false;
                    view.error = None;
                });
            }
            Err(err) => {
                let error = ListError::from_fetch(&err, &self.options.required_permissions);
                if err.is_permission_denied() {
                    debug!(error = %err, "list fetch denied");
                } else {
                    warn!(error = %err, "list fetch failed");
                }
                state.known_total = None;
                self.view_tx.send_modify(|view| {
                    view.page = PageResult::empty();
                    view.loading = false;
                    view.error = Some(error);
                });
            }
        }
    }
}
