//! Meter reading adjustment decisions.
//!
//! The server owns approval authority; the client only refuses to submit a
//! decision for an adjustment it already knows has been decided.

use meterdesk_api_models::{AdjustmentDecisionResponse, AdjustmentRejectRequest, decode_detail};
use meterdesk_core::{AdjustmentStatus, FetchError, RowId};
use tracing::info;

use crate::error::{ClientError, ClientResult};
use crate::transport::ApiClient;

/// Path of the adjustment collection.
pub const ADJUSTMENTS_PATH: &str = "/api/v1/meter-readings/adjustments";

/// Approve and reject meter reading adjustments.
#[derive(Debug, Clone)]
pub struct AdjustmentClient {
    client: ApiClient,
}

impl AdjustmentClient {
    /// Bind the adjustment endpoints to `client`.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Current status of adjustment `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Fetch`] when the record cannot be loaded or has
    /// no recognisable `status`.
    pub async fn adjustment_status(&self, id: &RowId) -> ClientResult<AdjustmentStatus> {
        let url = self
            .client
            .url_with_segments(ADJUSTMENTS_PATH, &[id.as_str()])?;
        let body = self.client.send(self.client.get(url)).await?;
        let record = decode_detail(&body).map_err(|err| FetchError::decode(err.to_string()))?;
        let status = record
            .get("status")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| FetchError::decode("adjustment has no status"))?;
        status
            .parse()
            .map_err(|err: meterdesk_core::CoreError| FetchError::decode(err.to_string()).into())
    }

    /// Approve adjustment `id`. When `known` is supplied and already decided,
    /// nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TransitionRefused`] for decided adjustments and
    /// [`ClientError::Fetch`] when the server rejects the request.
    pub async fn approve_adjustment(
        &self,
        id: &RowId,
        known: Option<AdjustmentStatus>,
    ) -> ClientResult<AdjustmentDecisionResponse> {
        ensure_transition(known, AdjustmentStatus::Approved)?;
        let url = self
            .client
            .url_with_segments(ADJUSTMENTS_PATH, &[id.as_str(), "approve"])?;
        let body = self.client.send(self.client.post(url)).await?;
        let decision = decode_decision(&body)?;
        info!(adjustment_id = %id, status = decision.status.as_str(), "adjustment approved");
        Ok(decision)
    }

    /// Reject adjustment `id` with `reason`. When `known` is supplied and
    /// already decided, nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TransitionRefused`] for decided adjustments and
    /// [`ClientError::Fetch`] when the server rejects the request.
    pub async fn reject_adjustment(
        &self,
        id: &RowId,
        reason: &str,
        known: Option<AdjustmentStatus>,
    ) -> ClientResult<AdjustmentDecisionResponse> {
        ensure_transition(known, AdjustmentStatus::Rejected)?;
        let url = self
            .client
            .url_with_segments(ADJUSTMENTS_PATH, &[id.as_str(), "reject"])?;
        let payload = AdjustmentRejectRequest {
            reason: reason.to_string(),
        };
        let body = self
            .client
            .send(self.client.post(url).json(&payload))
            .await?;
        let decision = decode_decision(&body)?;
        info!(adjustment_id = %id, status = decision.status.as_str(), "adjustment rejected");
        Ok(decision)
    }
}

fn ensure_transition(
    known: Option<AdjustmentStatus>,
    next: AdjustmentStatus,
) -> ClientResult<()> {
    match known {
        Some(current) if !current.can_transition_to(next) => Err(ClientError::TransitionRefused {
            from: current,
            to: next,
        }),
        _ => Ok(()),
    }
}

fn decode_decision(body: &[u8]) -> ClientResult<AdjustmentDecisionResponse> {
    let value = decode_detail(body).map_err(|err| FetchError::decode(err.to_string()))?;
    serde_json::from_value(value)
        .map_err(|err| FetchError::decode(format!("invalid adjustment decision: {err}")).into())
}
