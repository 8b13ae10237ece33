//! Scripted in-memory sources standing in for the REST transport.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use meterdesk_core::{
    DetailSource, FetchError, JobId, ListSource, PageResult, Query, ReportJob, ReportJobSource,
    ReportRequest, ReportStatus, Row, RowId,
};
use serde_json::Value;

use crate::fixtures::page_of;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A scripted reply: how long to wait and what to return.
#[derive(Debug, Clone)]
pub struct Scripted<T> {
    /// Simulated latency before the reply resolves.
    pub delay: Duration,
    /// Reply value.
    pub result: Result<T, FetchError>,
}

impl<T> Scripted<T> {
    /// Resolve immediately with `value`.
    #[must_use]
    pub const fn ok(value: T) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(value),
        }
    }

    /// Resolve immediately with `error`.
    #[must_use]
    pub const fn err(error: FetchError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    /// Delay the reply by `delay`.
    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type PageResponder = dyn Fn(&Query) -> Scripted<PageResult> + Send + Sync;

/// [`ListSource`] whose replies come from a closure; every query is recorded.
pub struct ScriptedListSource {
    responder: Box<PageResponder>,
    calls: Mutex<Vec<Query>>,
    completed: AtomicUsize,
}

impl ScriptedListSource {
    /// Reply to every query through `responder`.
    #[must_use]
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Query) -> Scripted<PageResult> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }

    /// Serve pages out of `rows`, answering immediately.
    #[must_use]
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self::new(move |query| Scripted::ok(page_of(&rows, query)))
    }

    /// Fail every query with `error`.
    #[must_use]
    pub fn failing(error: FetchError) -> Self {
        Self::new(move |_| Scripted::err(error.clone()))
    }

    /// Every query received, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<Query> {
        lock(&self.calls).clone()
    }

    /// Number of queries received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of replies that resolved (aborted fetches never count).
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListSource for ScriptedListSource {
    async fn fetch_page(&self, query: &Query) -> Result<PageResult, FetchError> {
        lock(&self.calls).push(query.clone());
        let scripted = (self.responder)(query);
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        scripted.result
    }
}

/// [`DetailSource`] backed by a fixed record map.
pub struct ScriptedDetailSource {
    records: HashMap<RowId, Value>,
    failures: HashMap<RowId, FetchError>,
    delay: Duration,
    calls: Mutex<Vec<RowId>>,
}

impl ScriptedDetailSource {
    /// Serve `records`; unknown ids answer with a 404 status error.
    #[must_use]
    pub fn new<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (RowId, Value)>,
    {
        Self {
            records: records.into_iter().collect(),
            failures: HashMap::new(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail lookups of `id` with `error`.
    #[must_use]
    pub fn with_failure(mut self, id: impl Into<RowId>, error: FetchError) -> Self {
        self.failures.insert(id.into(), error);
        self
    }

    /// Delay every reply.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Ids requested, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RowId> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl DetailSource for ScriptedDetailSource {
    async fn fetch_detail(&self, id: &RowId) -> Result<Value, FetchError> {
        lock(&self.calls).push(id.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(error) = self.failures.get(id) {
            return Err(error.clone());
        }
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::from_status(404, format!("record {id} not found")))
    }
}

/// One scripted status reply for a report job.
pub type StatusStep = Result<ReportStatus, FetchError>;

/// [`ReportJobSource`] replaying scripted status sequences per job.
///
/// Each status fetch pops the next step for the job; the final step repeats.
pub struct ScriptedReportSource {
    scripts: Mutex<BTreeMap<JobId, VecDeque<StatusStep>>>,
    next_id: AtomicUsize,
    status_calls: Mutex<Vec<JobId>>,
}

impl Default for ScriptedReportSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedReportSource {
    /// No scripted jobs; unknown jobs stay `PENDING` forever.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(BTreeMap::new()),
            next_id: AtomicUsize::new(1),
            status_calls: Mutex::new(Vec::new()),
        }
    }

    /// Script the status replies for `id`.
    #[must_use]
    pub fn with_script<I>(self, id: impl Into<JobId>, steps: I) -> Self
    where
        I: IntoIterator<Item = StatusStep>,
    {
        lock(&self.scripts).insert(id.into(), steps.into_iter().collect());
        self
    }

    /// Total status fetches received.
    #[must_use]
    pub fn status_call_count(&self) -> usize {
        lock(&self.status_calls).len()
    }

    /// Status fetches received for `id`.
    #[must_use]
    pub fn status_calls_for(&self, id: &JobId) -> usize {
        lock(&self.status_calls)
            .iter()
            .filter(|called| *called == id)
            .count()
    }

    fn job_with_status(id: &JobId, status: ReportStatus) -> ReportJob {
        let mut job = ReportJob::new(id.clone(), status);
        match status {
            ReportStatus::Completed => {
                job.download_url = Some(format!("https://reports.example/{id}.csv"));
            }
            ReportStatus::Failed => job.message = Some("report generation failed".into()),
            _ => {}
        }
        job
    }
}

#[async_trait]
impl ReportJobSource for ScriptedReportSource {
    async fn request_job(&self, _request: &ReportRequest) -> Result<ReportJob, FetchError> {
        let number = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = JobId::new(format!("job-{number}"));
        Ok(ReportJob::new(id, ReportStatus::Pending))
    }

    async fn fetch_job(&self, id: &JobId) -> Result<ReportJob, FetchError> {
        lock(&self.status_calls).push(id.clone());
        let step = {
            let mut scripts = lock(&self.scripts);
            match scripts.get_mut(id) {
                Some(steps) if steps.len() > 1 => steps.pop_front(),
                Some(steps) => steps.front().cloned(),
                None => None,
            }
        };
        match step {
            Some(Ok(status)) => Ok(Self::job_with_status(id, status)),
            Some(Err(error)) => Err(error),
            None => Ok(Self::job_with_status(id, ReportStatus::Pending)),
        }
    }
}
