//! Shared HTTPS client for panel APIs
//!
//! Thin wrapper over a hyper client with native TLS roots. Errors carry an
//! `action` label for status failures and a `service` label for
//! connectivity failures, matching the provider-facing error messages.

use std::time::Duration;

use bytes::Bytes;
use http::{header, Method, Request};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use super::error::{PanelError, PanelResult};

/// A fetched response body with its content type
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// The raw response body
    pub body: Bytes,
    /// The upstream `Content-Type`, when present
    pub content_type: Option<String>,
}

/// HTTPS client shared by all panels
#[derive(Clone)]
pub struct PanelHttp {
    client: Client<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl std::fmt::Debug for PanelHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelHttp").finish_non_exhaustive()
    }
}

impl PanelHttp {
    /// Create a client with native certificate roots
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Internal`] if the TLS backend cannot load the
    /// platform's root store.
    pub fn new() -> PanelResult<Self> {
        let https = HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| PanelError::internal(format!("failed to load TLS roots: {e}")))?
            .https_or_http()
            .enable_all_versions()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(https);
        Ok(Self { client })
    }

    /// POST a form-encoded body and return the response bytes
    ///
    /// Non-success statuses become [`PanelError::UpstreamStatus`] labeled
    /// with `action`; transport failures and timeouts become
    /// [`PanelError::Unreachable`] labeled with `service`.
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
        timeout: Duration,
        action: &'static str,
        service: &'static str,
    ) -> PanelResult<Bytes> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();

        let mut request = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let request = request
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| PanelError::internal(format!("failed to build request: {e}")))?;

        let fetched = self.execute(request, timeout, action, service).await?;
        Ok(fetched.body)
    }

    /// GET a URL and return the response body with its content type
    pub async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
        action: &'static str,
        service: &'static str,
    ) -> PanelResult<FetchedBody> {
        let mut request = Request::builder().method(Method::GET).uri(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let request = request
            .body(Full::new(Bytes::new()))
            .map_err(|e| PanelError::internal(format!("failed to build request: {e}")))?;

        self.execute(request, timeout, action, service).await
    }

    /// Send a request with a timeout and map failures to panel errors
    async fn execute(
        &self,
        request: Request<Full<Bytes>>,
        timeout: Duration,
        action: &'static str,
        service: &'static str,
    ) -> PanelResult<FetchedBody> {
        let uri = request.uri().clone();
        debug!(%uri, action, "panel API request");

        let response = tokio::time::timeout(timeout, self.client.request(request))
            .await
            .map_err(|_| PanelError::unreachable(service, format!("request to {uri} timed out")))?
            .map_err(|e| PanelError::unreachable(service, e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| PanelError::unreachable(service, e.to_string()))?
            .to_bytes();

        if !status.is_success() {
            debug!(%uri, %status, "panel API request rejected");
            return Err(PanelError::UpstreamStatus {
                action,
                status: status.as_u16(),
            });
        }

        Ok(FetchedBody { body, content_type })
    }
}

/// Parse a response body as JSON, labeling failures with the service name
pub fn parse_json(body: &Bytes, service: &'static str) -> PanelResult<serde_json::Value> {
    serde_json::from_slice(body).map_err(|_| PanelError::InvalidJson { service })
}
