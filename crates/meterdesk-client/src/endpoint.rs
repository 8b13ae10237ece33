//! Per-endpoint description of how a list query maps onto URL parameters.

use meterdesk_api_models::EnvelopeShape;
use meterdesk_core::Query;

/// Numbering of the `page` parameter on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageBase {
    /// First page is `1`.
    #[default]
    OneBased,
    /// First page is `0`.
    ZeroBased,
}

impl PageBase {
    const fn offset(self) -> u32 {
        match self {
            Self::OneBased => 1,
            Self::ZeroBased => 0,
        }
    }
}

/// Query parameter names understood by an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamNames {
    /// Page number parameter.
    pub page: &'static str,
    /// Page size parameter.
    pub page_size: &'static str,
    /// Free-text search parameter.
    pub search: &'static str,
    /// Sort field parameter.
    pub sort_field: &'static str,
    /// Sort direction parameter.
    pub sort_direction: &'static str,
}

impl Default for ParamNames {
    fn default() -> Self {
        Self {
            page: "page",
            page_size: "pageSize",
            search: "search",
            sort_field: "sortBy",
            sort_direction: "sortOrder",
        }
    }
}

/// Everything the REST source needs to talk to one list screen's endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    /// Path of the paginated list endpoint.
    pub list_path: String,
    /// Path prefix of the single-record endpoint (`{detail_path}/{id}`).
    pub detail_path: Option<String>,
    /// Layout of list responses.
    pub envelope: EnvelopeShape,
    /// Page numbering on the wire.
    pub page_base: PageBase,
    /// Parameter names.
    pub params: ParamNames,
    /// Row field holding the identifier.
    pub id_field: String,
}

impl EndpointSpec {
    /// List endpoint at `list_path` with default conventions and no detail endpoint.
    #[must_use]
    pub fn new(list_path: impl Into<String>) -> Self {
        Self {
            list_path: list_path.into(),
            detail_path: None,
            envelope: EnvelopeShape::default(),
            page_base: PageBase::default(),
            params: ParamNames::default(),
            id_field: "id".to_string(),
        }
    }

    /// Set the detail endpoint prefix.
    #[must_use]
    pub fn with_detail(mut self, detail_path: impl Into<String>) -> Self {
        self.detail_path = Some(detail_path.into());
        self
    }

    /// Set the response envelope layout.
    #[must_use]
    pub fn with_envelope(mut self, envelope: EnvelopeShape) -> Self {
        self.envelope = envelope;
        self
    }

    /// Set the page numbering.
    #[must_use]
    pub fn with_page_base(mut self, page_base: PageBase) -> Self {
        self.page_base = page_base;
        self
    }

    /// Set the identifier field.
    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Query-string pairs for `query`; empty search text is omitted.
    #[must_use]
    pub fn list_params(&self, query: &Query) -> Vec<(String, String)> {
        let page = query.page_index.saturating_add(self.page_base.offset());
        let mut params = vec![
            (self.params.page.to_string(), page.to_string()),
            (self.params.page_size.to_string(), query.page_size.to_string()),
        ];
        if let Some(term) = query.search_term() {
            params.push((self.params.search.to_string(), term.to_string()));
        }
        params.extend(
            query
                .filters
                .iter()
                .map(|(key, value)| (key.clone(), value.as_str().to_string())),
        );
        if let Some(sort) = &query.sort {
            params.push((self.params.sort_field.to_string(), sort.field.clone()));
            params.push((
                self.params.sort_direction.to_string(),
                sort.direction.as_str().to_string(),
            ));
        }
        params
    }
}
