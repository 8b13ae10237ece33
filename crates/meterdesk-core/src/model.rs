//! Domain types shared by the list controller, detail fetch, and report poller.
//!
//! # Design
//! - Rows are opaque JSON objects; only the identifier is interpreted.
//! - Identifiers accept numeric or string wire values and render as strings.
//! - Queries are plain values; mutations live in `query.rs`.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Identifier payloads accepted from the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawId> for String {
    fn from(value: RawId) -> Self {
        match value {
            RawId::Text(text) => text,
            RawId::Signed(number) => number.to_string(),
            RawId::Unsigned(number) => number.to_string(),
        }
    }
}

/// Unique identifier of a list row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct RowId(String);

impl RowId {
    /// Wrap an identifier value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract an identifier from a JSON value (string or integer).
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.is_empty() => Some(Self(text.clone())),
            Value::Number(number) if number.is_i64() || number.is_u64() => {
                Some(Self(number.to_string()))
            }
            _ => None,
        }
    }
}

impl From<RawId> for RowId {
    fn from(value: RawId) -> Self {
        Self(value.into())
    }
}

impl From<RowId> for String {
    fn from(value: RowId) -> Self {
        value.0
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for RowId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u32> for RowId {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl From<i32> for RowId {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

impl Display for RowId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// A single list row: an identifier plus opaque display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Row identifier used for detail fetches and selection.
    pub id: RowId,
    /// Field name to value mapping as returned by the server.
    pub fields: Map<String, Value>,
}

impl Row {
    /// Construct a row from an identifier and its fields.
    #[must_use]
    pub const fn new(id: RowId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Look up a raw field value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Render a field for tabular display; missing and null values render as `-`.
    #[must_use]
    pub fn display_field(&self, name: &str) -> String {
        match self.fields.get(name) {
            None | Some(Value::Null) => "-".to_string(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Rows and total count returned for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// Rows in server order.
    pub rows: Vec<Row>,
    /// Server-side count of matching rows, independent of page size.
    pub total_count: u64,
    /// False when the endpoint reported no total and `total_count` only
    /// counts the rows on this page.
    #[serde(default = "exact_by_default")]
    pub total_exact: bool,
}

const fn exact_by_default() -> bool {
    true
}

impl Default for PageResult {
    fn default() -> Self {
        Self::empty()
    }
}

impl PageResult {
    /// Construct a page from rows and the server total.
    #[must_use]
    pub const fn new(rows: Vec<Row>, total_count: u64) -> Self {
        Self {
            rows,
            total_count,
            total_exact: true,
        }
    }

    /// Construct a page whose endpoint does not report a total.
    #[must_use]
    pub fn without_total(rows: Vec<Row>) -> Self {
        let total_count = u64::try_from(rows.len()).unwrap_or(u64::MAX);
        Self {
            rows,
            total_count,
            total_exact: false,
        }
    }

    /// An empty page with a zero total.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    /// Server total when the endpoint reported one.
    #[must_use]
    pub const fn known_total(&self) -> Option<u64> {
        if self.total_exact {
            Some(self.total_count)
        } else {
            None
        }
    }

    /// Number of pages needed to show `total_count` rows at `page_size` per page.
    #[must_use]
    pub fn page_count(&self, page_size: u32) -> u64 {
        if page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(page_size))
    }
}

/// Selected value for a filter key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterValue(String);

impl FilterValue {
    /// Borrow the value as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FilterValue {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&String> for FilterValue {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for FilterValue {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self(value.to_string())
    }
}

/// Sort order applied by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest values first.
    Ascending,
    /// Largest values first.
    Descending,
}

impl SortDirection {
    /// Short wire label (`asc` / `desc`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(CoreError::InvalidSortDirection {
                value: other.to_string(),
            }),
        }
    }
}

/// Sort field and direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    /// Server field name.
    pub field: String,
    /// Direction applied to the field.
    pub direction: SortDirection,
}

/// Complete description of the rows a screen wants to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Free-text search; empty means no text filter.
    pub search_text: String,
    /// Selected filter values; an absent key is unset.
    pub filters: BTreeMap<String, FilterValue>,
    /// Optional sort order.
    pub sort: Option<Sort>,
    /// Zero-based page index.
    pub page_index: u32,
    /// Rows per page, always positive.
    pub page_size: u32,
}

impl Query {
    /// Default query for a screen using `page_size` rows per page.
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            search_text: String::new(),
            filters: BTreeMap::new(),
            sort: None,
            page_index: 0,
            page_size: page_size.max(1),
        }
    }

    /// Trimmed search term, or `None` when the search box is empty.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        let trimmed = self.search_text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Look up the selected value for a filter key.
    #[must_use]
    pub fn filter(&self, key: &str) -> Option<&FilterValue> {
        self.filters.get(key)
    }

    /// Offset of the first row on the current page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page_index) * u64::from(self.page_size)
    }
}

/// Identifier of a report job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Wrap a job identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<RawId> for JobId {
    fn from(value: RawId) -> Self {
        Self(value.into())
    }
}

impl From<JobId> for String {
    fn from(value: JobId) -> Self {
        value.0
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for JobId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Lifecycle state of a report job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    /// Accepted but not yet started.
    Pending,
    /// Being generated server-side.
    Processing,
    /// Finished; a download URL is available.
    Completed,
    /// Generation failed.
    Failed,
    /// Any status this client does not recognise; polled like a running job.
    #[serde(other)]
    Unknown,
}

impl ReportStatus {
    /// Whether no further transition can occur.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Wire label for display.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Request payload for a new report job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Server report type (for example `billing-summary`).
    pub kind: String,
    /// Report parameters such as period or scheme.
    pub parameters: BTreeMap<String, String>,
}

impl ReportRequest {
    /// Start a request for the given report kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Add a parameter, replacing any previous value for the key.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Current state of a submitted report job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportJob {
    /// Server-assigned identifier.
    pub id: JobId,
    /// Current lifecycle status.
    pub status: ReportStatus,
    /// Download location once the job completes.
    pub download_url: Option<String>,
    /// Failure or progress message from the server.
    pub message: Option<String>,
    /// When the job was accepted, if reported.
    pub requested_at: Option<DateTime<Utc>>,
}

impl ReportJob {
    /// Construct a job in the given state with no extra metadata.
    #[must_use]
    pub const fn new(id: JobId, status: ReportStatus) -> Self {
        Self {
            id,
            status,
            download_url: None,
            message: None,
            requested_at: None,
        }
    }

    /// Whether the job reached `COMPLETED` or `FAILED`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Approval state of a meter reading adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentStatus {
    /// Awaiting a decision.
    Pending,
    /// Accepted by an approver.
    Approved,
    /// Declined by an approver.
    Rejected,
}

impl AdjustmentStatus {
    /// Only pending adjustments may be decided, and only into a decided state.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected)
        )
    }

    /// Wire label for display.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl FromStr for AdjustmentStatus {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(CoreError::InvalidAdjustmentStatus {
                value: other.to_string(),
            }),
        }
    }
}
