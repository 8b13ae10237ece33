use meterdesk_api_models::AdjustmentDecisionResponse;
use meterdesk_client::AdjustmentClient;
use meterdesk_core::{AdjustmentStatus, RowId};

use crate::cli::{ApproveArgs, OutputFormat, RejectArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_decision;

pub(crate) async fn handle_approve(
    ctx: &AppContext,
    args: ApproveArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let decision = approve(ctx, &args).await?;
    print!("{}", render_decision(&decision, output)?);
    Ok(())
}

pub(crate) async fn handle_reject(
    ctx: &AppContext,
    args: RejectArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let decision = reject(ctx, &args).await?;
    print!("{}", render_decision(&decision, output)?);
    Ok(())
}

fn adjustment_id(raw: &str) -> CliResult<RowId> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(CliError::validation("adjustment id must not be empty"));
    }
    Ok(RowId::new(id))
}

/// Current status, unless the operator asked to skip the lookup.
async fn known_status(
    adjustments: &AdjustmentClient,
    id: &RowId,
    skip_check: bool,
) -> CliResult<Option<AdjustmentStatus>> {
    if skip_check {
        return Ok(None);
    }
    Ok(Some(adjustments.adjustment_status(id).await?))
}

async fn approve(ctx: &AppContext, args: &ApproveArgs) -> CliResult<AdjustmentDecisionResponse> {
    let id = adjustment_id(&args.id)?;
    let adjustments = AdjustmentClient::new(ctx.client.clone());
    let known = known_status(&adjustments, &id, args.skip_check).await?;
    Ok(adjustments.approve_adjustment(&id, known).await?)
}

async fn reject(ctx: &AppContext, args: &RejectArgs) -> CliResult<AdjustmentDecisionResponse> {
    let id = adjustment_id(&args.id)?;
    let reason = args.reason.trim();
    if reason.is_empty() {
        return Err(CliError::validation("a rejection reason is required"));
    }
    let adjustments = AdjustmentClient::new(ctx.client.clone());
    let known = known_status(&adjustments, &id, args.skip_check).await?;
    Ok(adjustments.reject_adjustment(&id, reason, known).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn approve_checks_status_first() {
        let server = MockServer::start_async().await;
        let lookup = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/meter-readings/adjustments/12");
            then.status(200)
                .json_body(json!({ "data": { "id": 12, "status": "PENDING" } }));
        });
        let decide = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/meter-readings/adjustments/12/approve");
            then.status(200)
                .json_body(json!({ "id": 12, "status": "APPROVED" }));
        });
        let ctx = AppContext::for_tests(&server.base_url());
        let args = ApproveArgs {
            id: "12".into(),
            skip_check: false,
        };

        let decision = approve(&ctx, &args).await.expect("approved");

        lookup.assert();
        decide.assert();
        assert_eq!(decision.status, AdjustmentStatus::Approved);
    }

    #[tokio::test]
    async fn decided_adjustment_is_refused_locally() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/meter-readings/adjustments/12");
            then.status(200)
                .json_body(json!({ "id": 12, "status": "REJECTED" }));
        });
        let decide = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/meter-readings/adjustments/12/approve");
            then.status(200);
        });
        let ctx = AppContext::for_tests(&server.base_url());
        let args = ApproveArgs {
            id: "12".into(),
            skip_check: false,
        };

        let err = approve(&ctx, &args).await.expect_err("refused");

        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.display_message(),
            "adjustment is REJECTED and cannot become APPROVED"
        );
        decide.assert_calls(0);
    }

    #[tokio::test]
    async fn reject_requires_reason() {
        let server = MockServer::start_async().await;
        let ctx = AppContext::for_tests(&server.base_url());
        let args = RejectArgs {
            id: "12".into(),
            reason: "  ".into(),
            skip_check: true,
        };

        let err = reject(&ctx, &args).await.expect_err("no reason");

        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn server_side_conflict_is_a_validation_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/meter-readings/adjustments/12/reject");
            then.status(409).json_body(json!({
                "title": "Conflict",
                "status": 409,
                "detail": "adjustment already decided"
            }));
        });
        let ctx = AppContext::for_tests(&server.base_url());
        let args = RejectArgs {
            id: "12".into(),
            reason: "duplicate".into(),
            skip_check: true,
        };

        let err = reject(&ctx, &args).await.expect_err("conflict");

        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.display_message(), "Conflict: adjustment already decided");
    }
}
