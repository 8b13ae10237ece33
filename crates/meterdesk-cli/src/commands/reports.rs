use anyhow::anyhow;
use meterdesk_client::RestReportSource;
use meterdesk_core::{JobId, ReportJob, ReportPoller, ReportRequest, ReportStatus};

use crate::cli::{OutputFormat, ReportRequestArgs, ReportWatchArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_jobs;

pub(crate) async fn handle_report_request(
    ctx: &AppContext,
    args: ReportRequestArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let jobs = request_report(ctx, &args).await?;
    print!("{}", render_jobs(&jobs, output)?);
    ensure_succeeded(&jobs)
}

pub(crate) async fn handle_report_watch(
    ctx: &AppContext,
    args: ReportWatchArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let jobs = watch_reports(ctx, &args).await?;
    print!("{}", render_jobs(&jobs, output)?);
    ensure_succeeded(&jobs)
}

fn poller_for(ctx: &AppContext) -> ReportPoller<RestReportSource> {
    ReportPoller::new(
        RestReportSource::new(ctx.client.clone()),
        ctx.config.poll_interval(),
    )
}

async fn request_report(ctx: &AppContext, args: &ReportRequestArgs) -> CliResult<Vec<ReportJob>> {
    let kind = args.kind.trim();
    if kind.is_empty() {
        return Err(CliError::validation("report type must not be empty"));
    }
    let request = args
        .parameters
        .iter()
        .fold(ReportRequest::new(kind), |request, (key, value)| {
            request.with_parameter(key.clone(), value.clone())
        });

    let poller = poller_for(ctx);
    let job = poller.submit(&request).await?;
    if !args.wait {
        return Ok(vec![job]);
    }
    Ok(poller.wait_until_settled().await?)
}

async fn watch_reports(ctx: &AppContext, args: &ReportWatchArgs) -> CliResult<Vec<ReportJob>> {
    let poller = poller_for(ctx);
    for id in &args.ids {
        let id = id.trim();
        if id.is_empty() {
            return Err(CliError::validation("report job ids must not be empty"));
        }
        poller.track(ReportJob::new(JobId::new(id), ReportStatus::Pending));
    }
    Ok(poller.wait_until_settled().await?)
}

fn ensure_succeeded(jobs: &[ReportJob]) -> CliResult<()> {
    let failed = jobs
        .iter()
        .filter(|job| job.status == ReportStatus::Failed)
        .count();
    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::failure(anyhow!("{failed} report job(s) failed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    fn request_args(wait: bool) -> ReportRequestArgs {
        ReportRequestArgs {
            kind: "billing-summary".into(),
            parameters: vec![("period".into(), "2024-07".into())],
            wait,
        }
    }

    #[tokio::test]
    async fn request_without_wait_returns_submitted_job() {
        let server = MockServer::start_async().await;
        let create = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/reports/jobs")
                .json_body(json!({
                    "reportType": "billing-summary",
                    "parameters": { "period": "2024-07" }
                }));
            then.status(201)
                .json_body(json!({ "id": "r-1", "status": "PENDING" }));
        });
        let status = server.mock(|when, then| {
            when.method(GET).path("/api/v1/reports/jobs/r-1");
            then.status(200)
                .json_body(json!({ "id": "r-1", "status": "COMPLETED" }));
        });
        let ctx = AppContext::for_tests(&server.base_url());

        let jobs = request_report(&ctx, &request_args(false))
            .await
            .expect("submitted");

        create.assert();
        status.assert_calls(0);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, ReportStatus::Pending);
    }

    #[tokio::test]
    async fn request_with_wait_polls_until_complete() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/reports/jobs");
            then.status(201)
                .json_body(json!({ "id": "r-2", "status": "PROCESSING" }));
        });
        let status = server.mock(|when, then| {
            when.method(GET).path("/api/v1/reports/jobs/r-2");
            then.status(200).json_body(json!({
                "data": {
                    "id": "r-2",
                    "status": "COMPLETED",
                    "downloadUrl": "https://files.example/r-2.csv"
                }
            }));
        });
        let ctx = AppContext::for_tests(&server.base_url());

        let jobs = request_report(&ctx, &request_args(true))
            .await
            .expect("settled");

        status.assert_calls(1);
        assert_eq!(jobs[0].status, ReportStatus::Completed);
        assert_eq!(
            jobs[0].download_url.as_deref(),
            Some("https://files.example/r-2.csv")
        );
        assert!(ensure_succeeded(&jobs).is_ok());
    }

    #[tokio::test]
    async fn watch_reports_failed_jobs() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/reports/jobs/r-3");
            then.status(200).json_body(json!({
                "id": "r-3",
                "status": "FAILED",
                "message": "no readings for period"
            }));
        });
        let ctx = AppContext::for_tests(&server.base_url());
        let args = ReportWatchArgs {
            ids: vec!["r-3".into()],
        };

        let jobs = watch_reports(&ctx, &args).await.expect("settled");

        assert_eq!(jobs[0].message.as_deref(), Some("no readings for period"));
        let err = ensure_succeeded(&jobs).expect_err("failed job");
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.display_message(), "1 report job(s) failed");
    }
}
