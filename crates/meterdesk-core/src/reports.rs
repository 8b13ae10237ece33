//! Fixed-interval polling of asynchronous report jobs.
//!
//! # Design
//! - One loop per poller, started when a non-terminal job is tracked.
//! - Each tick fetches every non-terminal job concurrently and merges by id.
//! - The loop clears its own handle and exits under the state lock once every
//!   job is terminal, so a concurrent `track` either sees a live loop or
//!   starts a new one.
//! - A failed status fetch keeps the previous state until the next tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult, FetchError};
use crate::model::{JobId, ReportJob, ReportRequest, ReportStatus};
use crate::source::ReportJobSource;

/// Interval between status polls when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

struct PollState {
    jobs: Vec<ReportJob>,
    task: Option<JoinHandle<()>>,
}

struct Shared<S> {
    source: S,
    interval: Duration,
    state: Mutex<PollState>,
    jobs_tx: watch::Sender<Vec<ReportJob>>,
    polling_tx: watch::Sender<bool>,
}

/// Submits report jobs and polls them until they settle.
pub struct ReportPoller<S: ReportJobSource> {
    shared: Arc<Shared<S>>,
}

impl<S: ReportJobSource> ReportPoller<S> {
    /// Build a poller; a zero interval falls back to [`DEFAULT_POLL_INTERVAL`].
    #[must_use]
    pub fn new(source: S, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            interval
        };
        let (jobs_tx, _) = watch::channel(Vec::new());
        let (polling_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                source,
                interval,
                state: Mutex::new(PollState {
                    jobs: Vec::new(),
                    task: None,
                }),
                jobs_tx,
                polling_tx,
            }),
        }
    }

    /// Submit a report request and start tracking the returned job.
    ///
    /// # Errors
    ///
    /// Returns the source's [`FetchError`] when the job could not be created.
    pub async fn submit(&self, request: &ReportRequest) -> Result<ReportJob, FetchError> {
        let job = self.shared.source.request_job(request).await?;
        info!(job_id = %job.id, kind = %request.kind, status = job.status.as_str(), "report job submitted");
        self.track(job.clone());
        Ok(job)
    }

    /// Track an existing job, replacing any entry with the same id.
    pub fn track(&self, job: ReportJob) {
        let mut state = self.shared.lock_state();
        match state.jobs.iter_mut().find(|existing| existing.id == job.id) {
            Some(existing) => *existing = job,
            None => state.jobs.push(job),
        }
        self.shared.jobs_tx.send_replace(state.jobs.clone());
        self.shared.ensure_polling(&mut state);
    }

    /// Snapshot of every tracked job.
    #[must_use]
    pub fn jobs(&self) -> Vec<ReportJob> {
        self.shared.lock_state().jobs.clone()
    }

    /// Observe job list updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<ReportJob>> {
        self.shared.jobs_tx.subscribe()
    }

    /// Whether the poll loop is currently scheduled.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        *self.shared.polling_tx.borrow()
    }

    /// Wait until the poll loop has stopped and return the settled jobs.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Closed`] if the poller state is torn down while waiting.
    pub async fn wait_until_settled(&self) -> CoreResult<Vec<ReportJob>> {
        let mut polling = self.shared.polling_tx.subscribe();
        polling
            .wait_for(|active| !*active)
            .await
            .map_err(|_| CoreError::Closed)?;
        Ok(self.jobs())
    }
}

impl<S: ReportJobSource> Drop for ReportPoller<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.shared.lock_state().task.take() {
            handle.abort();
        }
        self.shared.polling_tx.send_replace(false);
    }
}

impl<S: ReportJobSource> Shared<S> {
    fn lock_state(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_polling(self: &Arc<Self>, state: &mut PollState) {
        if state.task.is_some() || state.jobs.iter().all(ReportJob::is_terminal) {
            return;
        }
        debug!(interval = ?self.interval, "starting report poll loop");
        let shared = Arc::clone(self);
        state.task = Some(tokio::spawn(async move { shared.run().await }));
        self.polling_tx.send_replace(true);
    }

    async fn run(self: Arc<Self>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let pending: Vec<JobId> = self
                .lock_state()
                .jobs
                .iter()
                .filter(|job| !job.is_terminal())
                .map(|job| job.id.clone())
                .collect();
            let results = join_all(pending.iter().map(|id| self.source.fetch_job(id))).await;
            if self.merge(&pending, results) {
                break;
            }
        }
    }

    /// Merge one batch of status results; returns true once the loop should stop.
    fn merge(&self, ids: &[JobId], results: Vec<Result<ReportJob, FetchError>>) -> bool {
        let mut state = self.lock_state();
        for (id, result) in ids.iter().zip(results) {
            let fetched = match result {
                Ok(job) => job,
                Err(err) => {
                    warn!(job_id = %id, error = %err, "report status fetch failed");
                    continue;
                }
            };
            let Some(slot) = state
                .jobs
                .iter_mut()
                .find(|job| &job.id == id && !job.is_terminal())
            else {
                continue;
            };
            match fetched.status {
                ReportStatus::Completed => info!(job_id = %id, "report job completed"),
                ReportStatus::Failed => warn!(job_id = %id, message = ?fetched.message, "report job failed"),
                _ => {}
            }
            *slot = ReportJob {
                id: id.clone(),
                ..fetched
            };
        }
        self.jobs_tx.send_replace(state.jobs.clone());
        if state.jobs.iter().all(ReportJob::is_terminal) {
            state.task = None;
            self.polling_tx.send_replace(false);
            debug!("all report jobs terminal; poll loop stopping");
            true
        } else {
            false
        }
    }
}
