//! Shared HTTP client construction and response classification.

use std::time::Duration;

use meterdesk_api_models::ProblemDetails;
use meterdesk_core::FetchError;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, Url};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Header carrying the per-process request correlation id.
pub const HEADER_REQUEST_ID: &str = "x-request-id";
/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Inputs for building an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// API root; paths are joined onto it.
    pub base_url: String,
    /// Timeout applied to every request.
    pub timeout: Duration,
    /// Pre-established session cookie (`name=value`) sent with every request.
    pub session_cookie: Option<String>,
    /// Correlation id; a random one is generated when absent.
    pub request_id: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            session_cookie: None,
            request_id: None,
        }
    }
}

/// Cookie-carrying HTTP client bound to one API root.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client from settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the base URL or a header value is invalid,
    /// or the HTTP client cannot be built.
    pub fn new(settings: &ClientSettings) -> ClientResult<Self> {
        let base_url = parse_base_url(&settings.base_url)?;

        let mut default_headers = HeaderMap::new();
        let request_id = settings
            .request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let request_id = HeaderValue::from_str(&request_id).map_err(|_| {
            ClientError::InvalidHeader {
                name: HEADER_REQUEST_ID,
            }
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);
        if let Some(cookie) = settings.session_cookie.as_deref() {
            let mut value = HeaderValue::from_str(cookie)
                .map_err(|_| ClientError::InvalidHeader { name: "cookie" })?;
            value.set_sensitive(true);
            default_headers.insert(COOKIE, value);
        }

        let http = Client::builder()
            .timeout(settings.timeout)
            .cookie_store(true)
            .default_headers(default_headers)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { http, base_url })
    }

    /// Wrap an existing client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] when `base_url` cannot be parsed.
    pub fn from_parts(http: Client, base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// API root.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an absolute API path (for example `/api/v1/meters`) against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when the path cannot be joined.
    pub fn url(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| FetchError::transport(format!("invalid request path '{path}': {err}")))
    }

    /// Resolve `path` and append each of `segments` as a percent-encoded path segment.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when the URL cannot hold path segments.
    pub fn url_with_segments(&self, path: &str, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.url(path)?;
        url.path_segments_mut()
            .map_err(|()| FetchError::transport(format!("cannot extend request path '{path}'")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a GET request.
    #[must_use]
    pub fn get(&self, url: Url) -> RequestBuilder {
        self.http.get(url)
    }

    /// Start a POST request.
    #[must_use]
    pub fn post(&self, url: Url) -> RequestBuilder {
        self.http.post(url)
    }

    /// Send a request and return the body of a successful response.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when no response arrives and the
    /// classified status error for non-success responses.
    pub async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|err| FetchError::transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(classify_problem(response).await);
        }
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|err| FetchError::transport(format!("failed to read response body: {err}")))
    }
}

fn parse_base_url(input: &str) -> ClientResult<Url> {
    let normalised = if input.ends_with('/') {
        input.to_string()
    } else {
        format!("{input}/")
    };
    normalised
        .parse::<Url>()
        .map_err(|source| ClientError::InvalidUrl {
            url: input.to_string(),
            source,
        })
}

/// Classify a non-success response, preferring the problem document's summary.
pub async fn classify_problem(response: Response) -> FetchError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();

    let body_text = String::from_utf8_lossy(&bytes).trim().to_string();
    let problem = serde_json::from_slice::<ProblemDetails>(&bytes).ok();

    let message = problem
        .as_ref()
        .map(ProblemDetails::summary)
        .filter(|summary| !summary.is_empty())
        .unwrap_or_else(|| {
            if body_text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body_text
            }
        });
    debug!(status = status.as_u16(), %message, "request rejected");
    FetchError::from_status(status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&ClientSettings {
            base_url: server.base_url(),
            request_id: Some("trace-1".into()),
            session_cookie: Some("session=abc123".into()),
            ..ClientSettings::default()
        })
        .expect("client")
    }

    #[tokio::test]
    async fn requests_carry_request_id_and_session_cookie() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/ping")
                .header(HEADER_REQUEST_ID, "trace-1")
                .header("cookie", "session=abc123");
            then.status(200).body("pong");
        });
        let client = client_for(&server);

        let url = client.url("/api/v1/ping").expect("url");
        let body = client.send(client.get(url)).await.expect("send");

        assert_eq!(body, b"pong");
        mock.assert();
    }

    #[tokio::test]
    async fn forbidden_maps_to_permission_denied() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/meters");
            then.status(403).json_body(serde_json::json!({
                "type": "about:blank",
                "title": "Forbidden",
                "status": 403,
                "detail": "missing meters.view"
            }));
        });
        let client = client_for(&server);

        let url = client.url("/api/v1/meters").expect("url");
        let err = client.send(client.get(url)).await.expect_err("denied");

        assert_eq!(
            err,
            FetchError::PermissionDenied {
                message: Some("Forbidden: missing meters.view".into())
            }
        );
    }

    #[tokio::test]
    async fn other_statuses_keep_body_text() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/meters");
            then.status(502).body("bad gateway upstream");
        });
        let client = client_for(&server);

        let url = client.url("/api/v1/meters").expect("url");
        let err = client.send(client.get(url)).await.expect_err("failure");

        assert_eq!(
            err,
            FetchError::Status {
                status: 502,
                message: "bad gateway upstream".into()
            }
        );
    }

    #[test]
    fn base_url_paths_are_preserved_when_joining() {
        let client =
            ApiClient::from_parts(Client::new(), "https://billing.example/admin").expect("client");
        let url = client.url("/api/v1/meters").expect("url");
        assert_eq!(url.as_str(), "https://billing.example/admin/api/v1/meters");
        let detail = client
            .url_with_segments("/api/v1/meters", &["MTR 7"])
            .expect("detail url");
        assert_eq!(
            detail.as_str(),
            "https://billing.example/admin/api/v1/meters/MTR%207"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ApiClient::from_parts(Client::new(), "not a url").expect_err("invalid");
        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }
}
