//! XBoard panel provider
//!
//! The generic login → getSubscribe → download flow shared by XBoard-style
//! subscription panels. Other providers reuse these API helpers and adjust
//! the steps around them.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::error::{PanelError, PanelResult};
use super::http::{parse_json, FetchedBody, PanelHttp};
use super::params::{ParamMeta, QueryParam};
use super::{Panel, PanelContext, Subscription};

/// Timeout for the provider's API calls (login, subscribe info)
pub(crate) const API_TIMEOUT: Duration = Duration::from_secs(5);

/// Sentinel default for the `ua` parameter
///
/// Requests arriving with this value get the caller's own `User-Agent`
/// substituted by the HTTP layer before the panel runs.
pub const UA_FORWARD_SENTINEL: &str = "Request User-Agent";

const PARAMS: &[QueryParam] = &[
    QueryParam::new(
        "baseurl",
        ParamMeta::required().with_example("https://example.com"),
    ),
    QueryParam::new(
        "email",
        ParamMeta::required().with_example("user@example.com"),
    ),
    QueryParam::new("password", ParamMeta::required()),
    QueryParam::new("ua", ParamMeta::optional().with_default(UA_FORWARD_SENTINEL)),
];

/// Log in and return the bearer token
///
/// POSTs the credentials as a form and extracts `data.auth_data`.
pub(crate) async fn api_login(
    http: &PanelHttp,
    baseurl: &str,
    email: &str,
    password: &str,
    ua: &str,
) -> PanelResult<String> {
    let url = format!("{baseurl}/api/v1/passport/auth/login");

    let body = http
        .post_form(
            &url,
            &[("email", email), ("password", password)],
            &[("user-agent", ua)],
            API_TIMEOUT,
            "authentication request",
            "authentication",
        )
        .await?;

    let json = parse_json(&body, "authentication")?;
    match json["data"]["auth_data"].as_str() {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(PanelError::MissingToken),
    }
}

/// Fetch the user's subscription URL using the bearer token
pub(crate) async fn api_get_subscribe(
    http: &PanelHttp,
    baseurl: &str,
    auth_data: &str,
    ua: &str,
) -> PanelResult<String> {
    let url = format!("{baseurl}/api/v1/user/getSubscribe");

    let fetched = http
        .get(
            &url,
            &[("authorization", auth_data), ("user-agent", ua)],
            API_TIMEOUT,
            "subscription info request",
            "subscription",
        )
        .await?;

    let json = parse_json(&fetched.body, "subscription")?;
    match json["data"]["subscribe_url"].as_str() {
        Some(url) if !url.is_empty() => Ok(url.to_string()),
        _ => Err(PanelError::MissingSubscribeUrl),
    }
}

/// Download the subscription document itself
pub(crate) async fn download_subscription(
    http: &PanelHttp,
    url: &str,
    ua: &str,
    timeout: Duration,
) -> PanelResult<FetchedBody> {
    http.get(
        url,
        &[("user-agent", ua)],
        timeout,
        "subscription content request",
        "subscription",
    )
    .await
}

/// Run the full XBoard flow and relay the subscription body
pub(crate) async fn fetch_xboard(
    ctx: &PanelContext,
    params: &HashMap<String, String>,
    ua: &str,
) -> PanelResult<Subscription> {
    let baseurl = params["baseurl"].trim_end_matches('/').to_string();
    let email = &params["email"];
    let password = &params["password"];

    let auth_data = api_login(&ctx.http, &baseurl, email, password, ua).await?;
    let subscribe_url = api_get_subscribe(&ctx.http, &baseurl, &auth_data, ua).await?;

    info!(baseurl = %baseurl, "fetching subscription content");
    let fetched = download_subscription(&ctx.http, &subscribe_url, ua, ctx.fetch_timeout).await?;

    Ok(Subscription {
        body: fetched.body,
        content_type: fetched.content_type,
    })
}

/// Dynamic subscription fetcher for XBoard providers
#[derive(Debug, Default)]
pub struct XBoard;

#[async_trait]
impl Panel for XBoard {
    fn id(&self) -> &'static str {
        "xboard"
    }

    fn description(&self) -> &'static str {
        "Dynamic subscription fetcher for XBoard providers"
    }

    fn query_params(&self) -> &[QueryParam] {
        PARAMS
    }

    async fn fetch(
        &self,
        ctx: &PanelContext,
        params: &HashMap<String, String>,
    ) -> PanelResult<Subscription> {
        let ua = params
            .get("ua")
            .map_or(UA_FORWARD_SENTINEL, String::as_str)
            .to_string();
        fetch_xboard(ctx, params, &ua).await
    }
}

/// Stub provider server for exercising the panel flow in tests
#[cfg(test)]
pub(crate) mod stub {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned JSON responses for the XBoard API paths
    ///
    /// Returns the base URL of the stub. `subscription_body` is served at
    /// `/sub` with a YAML content type.
    pub(crate) async fn spawn_panel(subscription_body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let base = format!("http://127.0.0.1:{port}");

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };

                let mut buf = vec![0u8; 4096];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]).to_string();

                let (content_type, body) = if head.contains("/api/v1/passport/auth/login") {
                    (
                        "application/json",
                        r#"{"data":{"auth_data":"token-123"}}"#.to_string(),
                    )
                } else if head.contains("/api/v1/user/getSubscribe") {
                    (
                        "application/json",
                        format!(r#"{{"data":{{"subscribe_url":"http://127.0.0.1:{port}/sub"}}}}"#),
                    )
                } else if head.contains("/api/v1/user/bootstrap") {
                    ("application/json", r#"{"data":1}"#.to_string())
                } else if head.contains("GET /sub") {
                    ("text/yaml", subscription_body.to_string())
                } else {
                    ("application/json", r#"{"error":"not found"}"#.to_string())
                };

                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        base
    }
}
