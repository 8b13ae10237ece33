#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::pedantic, clippy::nursery)]
//! Shared HTTP DTOs for the Meterdesk billing API.
//!
//! List endpoints answer in one of several envelope layouts. Each layout is
//! normalised here into a [`PageResult`] so the list controller never sees a
//! raw envelope.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use meterdesk_core::{
    AdjustmentStatus, JobId, PageResult, ReportJob, ReportRequest, ReportStatus, Row, RowId,
};

/// RFC9457-compatible problem document surfaced on validation/runtime errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(rename = "type", default)]
    /// URI reference identifying the problem type.
    pub kind: String,
    /// Short, human-readable summary of the issue.
    #[serde(default)]
    pub title: String,
    /// HTTP status code associated with the error.
    #[serde(default)]
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Detailed diagnostic message when available.
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Parameters that failed validation, if applicable.
    pub invalid_params: Option<Vec<ProblemInvalidParam>>,
}

impl ProblemDetails {
    /// One-line message combining the title, detail, and invalid parameters.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut message = match (&self.detail, self.title.is_empty()) {
            (Some(detail), false) => format!("{}: {detail}", self.title),
            (Some(detail), true) => detail.clone(),
            (None, _) => self.title.clone(),
        };
        if let Some(params) = self.invalid_params.as_ref().filter(|p| !p.is_empty()) {
            let fields: Vec<String> = params
                .iter()
                .map(|param| format!("{} ({})", param.pointer, param.message))
                .collect();
            message.push_str(" [");
            message.push_str(&fields.join(", "));
            message.push(']');
        }
        message
    }
}

/// Invalid parameter pointer surfaced alongside a [`ProblemDetails`] payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemInvalidParam {
    /// JSON Pointer to the offending field.
    pub pointer: String,
    /// Human-readable description of the validation failure.
    pub message: String,
}

/// JSON layout used by a list endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EnvelopeShape {
    /// `{ "data": [...], "totalRecords": n }`
    #[default]
    DataTotalRecords,
    /// `{ "data": [...], "pagination": { "total": n } }`
    DataPagination,
    /// `[...]`, with no total; pages decode as inexact.
    BareArray,
}

/// Failures while normalising a response body.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The body was not valid JSON for the expected layout.
    #[error("malformed {shape:?} envelope: {source}")]
    Malformed {
        /// Layout that was expected.
        shape: EnvelopeShape,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },
    /// A row was not a JSON object.
    #[error("row {index} is not an object")]
    RowNotObject {
        /// Zero-based position in the page.
        index: usize,
    },
    /// A row lacked a usable identifier.
    #[error("row {index} has no usable '{field}' identifier")]
    MissingId {
        /// Zero-based position in the page.
        index: usize,
        /// Identifier field that was looked up.
        field: String,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalRecordsEnvelope {
    #[serde(default)]
    data: Option<Vec<Value>>,
    #[serde(default)]
    total_records: Option<u64>,
}

#[derive(Deserialize)]
struct PaginationEnvelope {
    #[serde(default)]
    data: Option<Vec<Value>>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct Pagination {
    #[serde(default)]
    total: Option<u64>,
}

/// Normalise a list response body into rows plus total count.
///
/// When the body carries no total the page is marked inexact and its
/// `total_count` is the number of rows returned.
///
/// # Errors
///
/// Returns [`EnvelopeError`] when the body does not match `shape` or a row
/// lacks an object body or identifier.
pub fn decode_page(
    shape: EnvelopeShape,
    body: &[u8],
    id_field: &str,
) -> Result<PageResult, EnvelopeError> {
    let malformed = |source: serde_json::Error| EnvelopeError::Malformed { shape, source };
    let (values, total) = match shape {
        EnvelopeShape::DataTotalRecords => {
            let envelope: TotalRecordsEnvelope =
                serde_json::from_slice(body).map_err(malformed)?;
            (envelope.data.unwrap_or_default(), envelope.total_records)
        }
        EnvelopeShape::DataPagination => {
            let envelope: PaginationEnvelope = serde_json::from_slice(body).map_err(malformed)?;
            let total = envelope.pagination.and_then(|pagination| pagination.total);
            (envelope.data.unwrap_or_default(), total)
        }
        EnvelopeShape::BareArray => {
            let values: Vec<Value> = serde_json::from_slice(body).map_err(malformed)?;
            (values, None)
        }
    };
    let rows = values
        .into_iter()
        .enumerate()
        .map(|(index, value)| row_from_value(index, value, id_field))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(match total {
        Some(total) => PageResult::new(rows, total),
        None => PageResult::without_total(rows),
    })
}

/// Convert one JSON row into a [`Row`], reading the identifier from `id_field`.
///
/// # Errors
///
/// Returns [`EnvelopeError::RowNotObject`] or [`EnvelopeError::MissingId`].
pub fn row_from_value(index: usize, value: Value, id_field: &str) -> Result<Row, EnvelopeError> {
    let Value::Object(fields) = value else {
        return Err(EnvelopeError::RowNotObject { index });
    };
    let id = fields
        .get(id_field)
        .and_then(RowId::from_json)
        .ok_or_else(|| EnvelopeError::MissingId {
            index,
            field: id_field.to_string(),
        })?;
    Ok(Row::new(id, fields))
}

/// Unwrap a single-record body: the `data` member when present, otherwise the body itself.
///
/// # Errors
///
/// Returns [`EnvelopeError::Malformed`] when the body is not JSON.
pub fn decode_detail(body: &[u8]) -> Result<Value, EnvelopeError> {
    let value: Value = serde_json::from_slice(body).map_err(|source| EnvelopeError::Malformed {
        shape: EnvelopeShape::DataTotalRecords,
        source,
    })?;
    Ok(match value {
        Value::Object(mut object) if object.get("data").is_some_and(|data| !data.is_null()) => {
            object.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    })
}

/// Body for `POST /api/v1/reports/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportJobCreateRequest {
    /// Server report type.
    pub report_type: String,
    /// Report parameters.
    #[serde(default)]
    pub parameters: std::collections::BTreeMap<String, String>,
}

impl From<&ReportRequest> for ReportJobCreateRequest {
    fn from(request: &ReportRequest) -> Self {
        Self {
            report_type: request.kind.clone(),
            parameters: request.parameters.clone(),
        }
    }
}

/// Report job state as returned by the create and status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportJobResponse {
    /// Job identifier.
    pub id: JobId,
    /// Lifecycle status.
    pub status: ReportStatus,
    /// Download location once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Failure or progress message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Submission timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
}

impl From<ReportJobResponse> for ReportJob {
    fn from(response: ReportJobResponse) -> Self {
        Self {
            id: response.id,
            status: response.status,
            download_url: response.download_url,
            message: response.message,
            requested_at: response.requested_at,
        }
    }
}

/// Body for `POST /api/v1/meter-readings/adjustments/{id}/reject`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdjustmentRejectRequest {
    /// Operator-supplied reason recorded with the rejection.
    pub reason: String,
}

/// Decision outcome returned by the approve and reject endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentDecisionResponse {
    /// Adjustment identifier.
    pub id: RowId,
    /// Status after the decision.
    pub status: AdjustmentStatus,
}
