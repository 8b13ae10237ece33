//! Report job endpoints.

use async_trait::async_trait;
use meterdesk_api_models::{ReportJobCreateRequest, ReportJobResponse, decode_detail};
use meterdesk_core::{FetchError, JobId, ReportJob, ReportJobSource, ReportRequest};
use tracing::debug;

use crate::transport::ApiClient;

/// Path of the report job collection.
pub const REPORT_JOBS_PATH: &str = "/api/v1/reports/jobs";

/// [`ReportJobSource`] backed by the report job endpoints.
#[derive(Debug, Clone)]
pub struct RestReportSource {
    client: ApiClient,
}

impl RestReportSource {
    /// Bind the report endpoints to `client`.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

fn decode_job(body: &[u8]) -> Result<ReportJob, FetchError> {
    let value = decode_detail(body).map_err(|err| FetchError::decode(err.to_string()))?;
    serde_json::from_value::<ReportJobResponse>(value)
        .map(ReportJob::from)
        .map_err(|err| FetchError::decode(format!("invalid report job: {err}")))
}

#[async_trait]
impl ReportJobSource for RestReportSource {
    async fn request_job(&self, request: &ReportRequest) -> Result<ReportJob, FetchError> {
        let url = self.client.url(REPORT_JOBS_PATH)?;
        let payload = ReportJobCreateRequest::from(request);
        debug!(kind = %request.kind, "POST report job");
        let body = self.client.send(self.client.post(url).json(&payload)).await?;
        decode_job(&body)
    }

    async fn fetch_job(&self, id: &JobId) -> Result<ReportJob, FetchError> {
        let url = self
            .client
            .url_with_segments(REPORT_JOBS_PATH, &[id.as_str()])?;
        let body = self.client.send(self.client.get(url)).await?;
        decode_job(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ClientSettings;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use meterdesk_core::ReportStatus;
    use serde_json::json;

    fn source_for(server: &MockServer) -> RestReportSource {
        RestReportSource::new(
            ApiClient::new(&ClientSettings {
                base_url: server.base_url(),
                ..ClientSettings::default()
            })
            .expect("client"),
        )
    }

    #[tokio::test]
    async fn request_job_posts_camel_case_payload() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/reports/jobs")
                .json_body(json!({
                    "reportType": "billing-summary",
                    "parameters": { "period": "2024-07" }
                }));
            then.status(201)
                .json_body(json!({ "id": "r-19", "status": "PENDING" }));
        });
        let source = source_for(&server);

        let job = source
            .request_job(&ReportRequest::new("billing-summary").with_parameter("period", "2024-07"))
            .await
            .expect("job");

        mock.assert();
        assert_eq!(job.id, JobId::from("r-19"));
        assert_eq!(job.status, ReportStatus::Pending);
    }

    #[tokio::test]
    async fn fetch_job_reads_download_url() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/reports/jobs/r-19");
            then.status(200).json_body(json!({
                "data": {
                    "id": "r-19",
                    "status": "COMPLETED",
                    "downloadUrl": "https://files.example/r-19.xlsx"
                }
            }));
        });
        let source = source_for(&server);

        let job = source.fetch_job(&JobId::from("r-19")).await.expect("job");

        assert!(job.is_terminal());
        assert_eq!(
            job.download_url.as_deref(),
            Some("https://files.example/r-19.xlsx")
        );
    }

    #[tokio::test]
    async fn job_without_status_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/reports/jobs/r-20");
            then.status(200).json_body(json!({ "id": "r-20" }));
        });
        let source = source_for(&server);

        let err = source
            .fetch_job(&JobId::from("r-20"))
            .await
            .expect_err("decode");

        assert!(matches!(err, FetchError::Decode { .. }));
    }
}
