//! Async seams between the controllers and whatever transport serves them.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;
use crate::model::{JobId, PageResult, Query, ReportJob, ReportRequest, RowId};

/// Serves one page of rows for a query.
#[async_trait]
pub trait ListSource: Send + Sync + 'static {
    /// Fetch the page described by `query`.
    async fn fetch_page(&self, query: &Query) -> Result<PageResult, FetchError>;
}

/// Serves a single record by identifier.
#[async_trait]
pub trait DetailSource: Send + Sync + 'static {
    /// Fetch the detail payload for `id`.
    async fn fetch_detail(&self, id: &RowId) -> Result<Value, FetchError>;
}

/// Creates report jobs and reports their status.
#[async_trait]
pub trait ReportJobSource: Send + Sync + 'static {
    /// Submit a new report job.
    async fn request_job(&self, request: &ReportRequest) -> Result<ReportJob, FetchError>;

    /// Look up the current status of a job.
    async fn fetch_job(&self, id: &JobId) -> Result<ReportJob, FetchError>;
}

#[async_trait]
impl<T> ListSource for Arc<T>
where
    T: ListSource + ?Sized,
{
    async fn fetch_page(&self, query: &Query) -> Result<PageResult, FetchError> {
        (**self).fetch_page(query).await
    }
}

#[async_trait]
impl<T> DetailSource for Arc<T>
where
    T: DetailSource + ?Sized,
{
    async fn fetch_detail(&self, id: &RowId) -> Result<Value, FetchError> {
        (**self).fetch_detail(id).await
    }
}

#[async_trait]
impl<T> ReportJobSource for Arc<T>
where
    T: ReportJobSource + ?Sized,
{
    async fn request_job(&self, request: &ReportRequest) -> Result<ReportJob, FetchError> {
        (**self).request_job(request).await
    }

    async fn fetch_job(&self, id: &JobId) -> Result<ReportJob, FetchError> {
        (**self).fetch_job(id).await
    }
}
