use std::time::Duration;

use meterdesk_client::{RestSource, Screen};
use meterdesk_core::{
    CoreError, DetailController, DetailView, FilterValue, ListController, ListSource, ListView,
    Query, RowId, Sort,
};
use serde_json::Value;

use crate::cli::{ListArgs, OutputFormat, ShowArgs};
use crate::client::{AppContext, CliError, CliResult, list_failure};
use crate::output::{render_detail, render_page, render_screens};

pub(crate) fn handle_screens(output: OutputFormat) -> CliResult<()> {
    print!("{}", render_screens(output)?);
    Ok(())
}

pub(crate) async fn handle_list(
    ctx: &AppContext,
    args: ListArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let view = fetch_list(ctx, &args).await?;
    if let Some(error) = &view.error {
        return Err(list_failure(error));
    }
    print!("{}", render_page(args.screen, &view, output)?);
    Ok(())
}

pub(crate) async fn handle_show(
    ctx: &AppContext,
    args: ShowArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let id = RowId::new(args.id.trim());
    let record = fetch_detail(ctx, args.screen, id.clone()).await?;
    print!("{}", render_detail(args.screen, &id, &record, output)?);
    Ok(())
}

pub(crate) fn source_for(ctx: &AppContext, screen: Screen) -> RestSource {
    RestSource::new(ctx.client.clone(), screen.endpoint())
}

/// Load one page through a list controller and return the settled view.
pub(crate) async fn fetch_list(ctx: &AppContext, args: &ListArgs) -> CliResult<ListView> {
    if args.page == 0 {
        return Err(CliError::validation("page numbers start at 1"));
    }
    let page_size = args.page_size.unwrap_or(ctx.config.list.page_size);
    if page_size == 0 {
        return Err(CoreError::InvalidPageSize.into());
    }

    let mut query = Query::new(page_size);
    if let Some(search) = &args.search {
        query.search_text.clone_from(search);
    }
    for (key, value) in &args.filters {
        query
            .filters
            .insert(key.clone(), FilterValue::from(value.as_str()));
    }
    query.sort = args
        .sort
        .clone()
        .map(|(field, direction)| Sort { field, direction });
    query.page_index = args.page - 1;

    let controller = ListController::with_query(
        source_for(ctx, args.screen),
        args.screen.list_options(Duration::ZERO, page_size),
        query,
    );
    controller.load();
    settle(&controller).await
}

/// Wait for any pending search to commit and the resulting fetch to finish.
pub(crate) async fn settle<S: ListSource>(controller: &ListController<S>) -> CliResult<ListView> {
    let mut views = controller.subscribe();
    while controller.pending_search().is_some() {
        tokio::time::sleep(controller.options().debounce).await;
    }
    let view = views
        .wait_for(|view| !view.loading)
        .await
        .map_err(|_| CliError::from(CoreError::Closed))?
        .clone();
    Ok(view)
}

async fn fetch_detail(ctx: &AppContext, screen: Screen, id: RowId) -> CliResult<Value> {
    let details = DetailController::new(source_for(ctx, screen));
    let mut views = details.subscribe();
    details.select(id);
    let view = views
        .wait_for(DetailView::is_settled)
        .await
        .map_err(|_| CliError::from(CoreError::Closed))?
        .clone();
    match (view.record, view.error) {
        (Some(record), _) => Ok(record),
        (None, Some(message)) => Err(CliError::failure(anyhow::anyhow!(message))),
        (None, None) => Err(CliError::failure(anyhow::anyhow!("record was not returned"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use meterdesk_core::SortDirection;
    use serde_json::json;

    fn list_args(screen: Screen) -> ListArgs {
        ListArgs {
            screen,
            search: None,
            filters: Vec::new(),
            sort: None,
            page: 1,
            page_size: None,
        }
    }

    #[tokio::test]
    async fn ls_sends_query_parameters() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/connections/disconnected")
                .query_param("page", "2")
                .query_param("pageSize", "10")
                .query_param("search", "kamau")
                .query_param("schemeId", "4")
                .query_param("sortBy", "disconnectedAt")
                .query_param("sortOrder", "desc");
            then.status(200).json_body(json!({
                "data": [{ "id": 7, "customerName": "J. Kamau" }],
                "totalRecords": 11
            }));
        });
        let ctx = AppContext::for_tests(&server.base_url());
        let args = ListArgs {
            search: Some("kamau".into()),
            filters: vec![("schemeId".into(), "4".into())],
            sort: Some(("disconnectedAt".into(), SortDirection::Descending)),
            page: 2,
            page_size: Some(10),
            ..list_args(Screen::DisconnectedConnections)
        };

        let view = fetch_list(&ctx, &args).await.expect("view");

        mock.assert();
        assert_eq!(view.page.total_count, 11);
        assert_eq!(view.page.rows[0].id, RowId::from(7_u32));
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn ls_pages_past_first_page_without_server_total() {
        let server = MockServer::start_async().await;
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/sms/history")
                .query_param("page", "0");
            then.status(200).json_body(json!([
                { "smsId": "s-1", "status": "SENT" },
                { "smsId": "s-2", "status": "SENT" }
            ]));
        });
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/sms/history")
                .query_param("page", "1")
                .query_param("pageSize", "2");
            then.status(200).json_body(json!([
                { "smsId": "s-3", "status": "FAILED" },
                { "smsId": "s-4", "status": "SENT" }
            ]));
        });
        let ctx = AppContext::for_tests(&server.base_url());
        let args = ListArgs {
            page: 2,
            page_size: Some(2),
            ..list_args(Screen::SmsHistory)
        };

        let view = fetch_list(&ctx, &args).await.expect("view");

        second.assert_calls(1);
        first.assert_calls(0);
        assert_eq!(view.query.page_index, 1);
        assert_eq!(view.page.rows[0].id, RowId::from("s-3"));
        assert!(view.page.known_total().is_none());
    }

    #[tokio::test]
    async fn ls_reports_access_denied_with_permissions() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/payments/unreceipted");
            then.status(403).json_body(json!({
                "title": "Forbidden",
                "status": 403,
                "detail": "missing payments.view"
            }));
        });
        let ctx = AppContext::for_tests(&server.base_url());

        let err = handle_list(&ctx, list_args(Screen::UnreceiptedPayments), OutputFormat::Table)
            .await
            .expect_err("denied");

        assert_eq!(err.exit_code(), 3);
        assert_eq!(
            err.display_message(),
            "Access denied: requires payments.view, receipts.create"
        );
    }

    #[tokio::test]
    async fn ls_rejects_page_zero_without_requesting() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/meters");
            then.status(200).json_body(json!({ "data": [] }));
        });
        let ctx = AppContext::for_tests(&server.base_url());
        let args = ListArgs {
            page: 0,
            ..list_args(Screen::Meters)
        };

        let err = fetch_list(&ctx, &args).await.expect_err("invalid page");

        assert_eq!(err.exit_code(), 2);
        mock.assert_calls(0);
    }

    #[tokio::test]
    async fn show_renders_detail_record() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/meters/42");
            then.status(200)
                .json_body(json!({ "data": { "id": 42, "meterNumber": "MTR-0042" } }));
        });
        let ctx = AppContext::for_tests(&server.base_url());

        let record = fetch_detail(&ctx, Screen::Meters, RowId::from(42_u32))
            .await
            .expect("record");

        mock.assert();
        assert_eq!(record["meterNumber"], json!("MTR-0042"));
    }

    #[tokio::test]
    async fn show_without_detail_endpoint_fails() {
        let server = MockServer::start_async().await;
        let ctx = AppContext::for_tests(&server.base_url());

        let err = fetch_detail(&ctx, Screen::SmsHistory, RowId::from("s-1"))
            .await
            .expect_err("no detail endpoint");

        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().starts_with("failed to load details"));
    }
}
