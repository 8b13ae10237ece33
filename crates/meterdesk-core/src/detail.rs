//! Single-record fetch behind a list row, independent of the page lifecycle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::model::RowId;
use crate::source::DetailSource;
use crate::view::DetailView;

/// Outcome of [`DetailController::select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// A panel opened (or moved) to the row and a fetch was issued.
    Opened,
    /// The row was already open, so its panel closed.
    Closed,
}

struct DetailState {
    selected: Option<RowId>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

struct Shared<S> {
    source: S,
    state: Mutex<DetailState>,
    view_tx: watch::Sender<DetailView>,
}

/// Tracks the open detail panel for one list screen.
pub struct DetailController<S: DetailSource> {
    shared: Arc<Shared<S>>,
}

impl<S: DetailSource> DetailController<S> {
    /// Build a controller with no panel open.
    #[must_use]
    pub fn new(source: S) -> Self {
        let (view_tx, _) = watch::channel(DetailView::default());
        Self {
            shared: Arc::new(Shared {
                source,
                state: Mutex::new(DetailState {
                    selected: None,
                    generation: 0,
                    in_flight: None,
                }),
                view_tx,
            }),
        }
    }

    /// Observe detail view updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DetailView> {
        self.shared.view_tx.subscribe()
    }

    /// Latest published detail view.
    #[must_use]
    pub fn view(&self) -> DetailView {
        self.shared.view_tx.borrow().clone()
    }

    /// Toggle the panel for `id`: selecting the open row closes it, any other
    /// row replaces the selection and fetches its record.
    pub fn select(&self, id: impl Into<RowId>) -> Selection {
        let id = id.into();
        let mut state = self.shared.lock_state();
        if state.selected.as_ref() == Some(&id) {
            self.shared.close(&mut state);
            return Selection::Closed;
        }
        if let Some(previous) = state.in_flight.take() {
            previous.abort();
        }
        state.generation += 1;
        let generation = state.generation;
        state.selected = Some(id.clone());
        debug!(generation, id = %id, "fetching detail record");

        let shared = Arc::clone(&self.shared);
        let request = id.clone();
        state.in_flight = Some(tokio::spawn(async move {
            let outcome = shared.source.fetch_detail(&request).await;
            shared.complete(generation, outcome);
        }));
        self.shared.view_tx.send_replace(DetailView {
            selected: Some(id),
            record: None,
            loading: true,
            error: None,
        });
        Selection::Opened
    }

    /// Close the panel, cancelling any outstanding fetch.
    pub fn close(&self) {
        let mut state = self.shared.lock_state();
        self.shared.close(&mut state);
    }
}

impl<S: DetailSource> Drop for DetailController<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.shared.lock_state().in_flight.take() {
            handle.abort();
        }
    }
}

impl<S: DetailSource> Shared<S> {
    fn lock_state(&self) -> MutexGuard<'_, DetailState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self, state: &mut DetailState) {
        if let Some(previous) = state.in_flight.take() {
            previous.abort();
        }
        state.generation += 1;
        state.selected = None;
        self.view_tx.send_replace(DetailView::default());
    }

    fn complete(&self, generation: u64, outcome: Result<Value, FetchError>) {
        let mut state = self.lock_state();
        if generation != state.generation {
            debug!(generation, "discarding stale detail response");
            return;
        }
        state.in_flight = None;
        let (record, error) = match outcome {
            Ok(record) => (Some(record), None),
            Err(err) if err.is_permission_denied() => {
                debug!(error = %err, "detail fetch denied");
                (None, Some("access denied".to_string()))
            }
            Err(err) => {
                warn!(error = %err, "detail fetch failed");
                (None, Some(format!("failed to load details: {err}")))
            }
        };
        self.view_tx.send_modify(|view| {
            view.record = record;
            view.error = error;
            view.loading = false;
        });
    }
}
