use std::sync::Arc;
use std::time::Duration;

use meterdesk_core::{FetchError, JobId, ReportJob, ReportPoller, ReportRequest, ReportStatus};
use meterdesk_test_support::mocks::ScriptedReportSource;
use tokio::time::{sleep, timeout};

const INTERVAL: Duration = Duration::from_millis(100);

async fn settle<S: meterdesk_core::ReportJobSource>(poller: &ReportPoller<S>) -> Vec<ReportJob> {
    timeout(Duration::from_secs(10), poller.wait_until_settled())
        .await
        .expect("poller settled in time")
        .expect("poller alive")
}

#[tokio::test(start_paused = true)]
async fn polling_stops_once_every_job_is_terminal() {
    let source = Arc::new(
        ScriptedReportSource::new()
            .with_script(
                "job-1",
                [Ok(ReportStatus::Pending), Ok(ReportStatus::Completed)],
            )
            .with_script(
                "job-2",
                [
                    Ok(ReportStatus::Processing),
                    Ok(ReportStatus::Processing),
                    Ok(ReportStatus::Failed),
                ],
            ),
    );
    let poller = ReportPoller::new(Arc::clone(&source), INTERVAL);

    poller
        .submit(&ReportRequest::new("billing-summary").with_parameter("period", "2024-05"))
        .await
        .expect("first job");
    poller
        .submit(&ReportRequest::new("sms-delivery"))
        .await
        .expect("second job");
    assert!(poller.is_polling());

    let jobs = settle(&poller).await;
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].status, ReportStatus::Completed);
    assert_eq!(
        jobs[0].download_url.as_deref(),
        Some("https://reports.example/job-1.csv")
    );
    assert_eq!(jobs[1].status, ReportStatus::Failed);
    assert_eq!(source.status_calls_for(&JobId::from("job-1")), 2);
    assert_eq!(source.status_call_count(), 5);

    let calls = source.status_call_count();
    sleep(INTERVAL * 10).await;
    assert_eq!(source.status_call_count(), calls, "no timer remains");
    assert!(!poller.is_polling());
}

#[tokio::test(start_paused = true)]
async fn failed_status_fetch_keeps_previous_state_and_retries() {
    let source = Arc::new(ScriptedReportSource::new().with_script(
        "job-1",
        [
            Err(FetchError::transport("connection refused")),
            Ok(ReportStatus::Completed),
        ],
    ));
    let poller = ReportPoller::new(Arc::clone(&source), INTERVAL);
    let mut rx = poller.subscribe();

    poller.submit(&ReportRequest::new("arrears")).await.expect("job");
    sleep(INTERVAL + Duration::from_millis(10)).await;
    assert_eq!(source.status_call_count(), 1);
    assert_eq!(rx.borrow_and_update()[0].status, ReportStatus::Pending);

    let jobs = settle(&poller).await;
    assert_eq!(jobs[0].status, ReportStatus::Completed);
    assert_eq!(source.status_call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn tracking_terminal_job_does_not_start_polling() {
    let source = Arc::new(ScriptedReportSource::new());
    let poller = ReportPoller::new(Arc::clone(&source), INTERVAL);

    poller.track(ReportJob::new(JobId::from("done"), ReportStatus::Completed));
    assert!(!poller.is_polling());
    sleep(INTERVAL * 3).await;

    assert_eq!(source.status_call_count(), 0);
    assert_eq!(settle(&poller).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn tracking_after_settle_restarts_the_loop() {
    let source = Arc::new(
        ScriptedReportSource::new()
            .with_script("job-1", [Ok(ReportStatus::Completed)])
            .with_script("resumed", [Ok(ReportStatus::Processing), Ok(ReportStatus::Completed)]),
    );
    let poller = ReportPoller::new(Arc::clone(&source), INTERVAL);

    poller.submit(&ReportRequest::new("arrears")).await.expect("job");
    settle(&poller).await;

    poller.track(ReportJob::new(JobId::from("resumed"), ReportStatus::Pending));
    assert!(poller.is_polling());
    let jobs = settle(&poller).await;

    assert!(jobs.iter().all(ReportJob::is_terminal));
    assert_eq!(source.status_calls_for(&JobId::from("resumed")), 2);
    assert_eq!(source.status_calls_for(&JobId::from("job-1")), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_poller_stops_the_loop() {
    let source = Arc::new(ScriptedReportSource::new());
    let poller = ReportPoller::new(Arc::clone(&source), INTERVAL);
    poller.submit(&ReportRequest::new("arrears")).await.expect("job");
    sleep(INTERVAL * 2 + Duration::from_millis(10)).await;
    let seen = source.status_call_count();
    assert_eq!(seen, 2);

    drop(poller);
    sleep(INTERVAL * 5).await;

    assert_eq!(source.status_call_count(), seen);
}
