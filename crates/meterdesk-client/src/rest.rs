//! REST-backed list and detail sources.

use async_trait::async_trait;
use meterdesk_api_models::{decode_detail, decode_page};
use meterdesk_core::{DetailSource, FetchError, ListSource, PageResult, Query, RowId};
use serde_json::Value;
use tracing::debug;

use crate::endpoint::EndpointSpec;
use crate::transport::ApiClient;

/// Serves one screen's list and detail endpoints.
#[derive(Debug, Clone)]
pub struct RestSource {
    client: ApiClient,
    endpoint: EndpointSpec,
}

impl RestSource {
    /// Bind `endpoint` to `client`.
    #[must_use]
    pub const fn new(client: ApiClient, endpoint: EndpointSpec) -> Self {
        Self { client, endpoint }
    }

    /// Endpoint description in use.
    #[must_use]
    pub const fn endpoint(&self) -> &EndpointSpec {
        &self.endpoint
    }
}

#[async_trait]
impl ListSource for RestSource {
    async fn fetch_page(&self, query: &Query) -> Result<PageResult, FetchError> {
        let mut url = self.client.url(&self.endpoint.list_path)?;
        url.query_pairs_mut()
            .extend_pairs(self.endpoint.list_params(query));
        debug!(url = %url, "GET list page");
        let body = self.client.send(self.client.get(url)).await?;
        decode_page(self.endpoint.envelope, &body, &self.endpoint.id_field)
            .map_err(|err| FetchError::decode(err.to_string()))
    }
}

#[async_trait]
impl DetailSource for RestSource {
    async fn fetch_detail(&self, id: &RowId) -> Result<Value, FetchError> {
        let Some(detail_path) = self.endpoint.detail_path.as_deref() else {
            return Err(FetchError::Status {
                status: 404,
                message: format!("{} has no detail endpoint", self.endpoint.list_path),
            });
        };
        let url = self.client.url_with_segments(detail_path, &[id.as_str()])?;
        debug!(url = %url, "GET detail record");
        let body = self.client.send(self.client.get(url)).await?;
        decode_detail(&body).map_err(|err| FetchError::decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::PageBase;
    use crate::transport::ClientSettings;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use meterdesk_api_models::EnvelopeShape;
    use serde_json::json;

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&ClientSettings {
            base_url: server.base_url(),
            ..ClientSettings::default()
        })
        .expect("client")
    }

    #[tokio::test]
    async fn list_fetch_sends_query_and_normalises_envelope() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/meters")
                .query_param("page", "2")
                .query_param("pageSize", "10")
                .query_param("search", "MTR")
                .query_param("schemeId", "4");
            then.status(200).json_body(json!({
                "data": [{ "id": 11, "meterNumber": "MTR-11" }],
                "pagination": { "total": 11 }
            }));
        });
        let source = RestSource::new(
            client_for(&server),
            EndpointSpec::new("/api/v1/meters").with_envelope(EnvelopeShape::DataPagination),
        );
        let mut query = Query::new(10);
        query.page_index = 1;
        query.search_text = "MTR".into();
        query.filters.insert("schemeId".into(), "4".into());

        let page = source.fetch_page(&query).await.expect("page");

        mock.assert();
        assert_eq!(page.total_count, 11);
        assert_eq!(page.rows[0].id, RowId::from("11"));
    }

    #[tokio::test]
    async fn list_fetch_reports_forbidden_as_permission_denied() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/payments/unreceipted");
            then.status(403);
        });
        let source = RestSource::new(
            client_for(&server),
            EndpointSpec::new("/api/v1/payments/unreceipted"),
        );

        let err = source
            .fetch_page(&Query::new(25))
            .await
            .expect_err("denied");

        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/sms/history");
            then.status(200).body("<html>oops</html>");
        });
        let source = RestSource::new(
            client_for(&server),
            EndpointSpec::new("/api/v1/sms/history")
                .with_envelope(EnvelopeShape::BareArray)
                .with_page_base(PageBase::ZeroBased),
        );

        let err = source
            .fetch_page(&Query::new(25))
            .await
            .expect_err("decode");

        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn detail_fetch_unwraps_data() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/meters/42");
            then.status(200)
                .json_body(json!({ "data": { "id": 42, "status": "ACTIVE" } }));
        });
        let source = RestSource::new(
            client_for(&server),
            EndpointSpec::new("/api/v1/meters").with_detail("/api/v1/meters"),
        );

        let record = source
            .fetch_detail(&RowId::from(42_u32))
            .await
            .expect("record");

        mock.assert();
        assert_eq!(record, json!({ "id": 42, "status": "ACTIVE" }));
    }

    #[tokio::test]
    async fn detail_without_endpoint_is_not_found() {
        let server = MockServer::start_async().await;
        let source = RestSource::new(client_for(&server), EndpointSpec::new("/api/v1/sms/history"));

        let err = source
            .fetch_detail(&RowId::from("a1"))
            .await
            .expect_err("no endpoint");

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }
}
