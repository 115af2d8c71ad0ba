//! Netsyo panel provider
//!
//! XBoard flow with one extra step: Netsyo rate-limits subscription
//! downloads and requires an unlock call between login and fetching the
//! subscription URL.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::error::{PanelError, PanelResult};
use super::http::{parse_json, PanelHttp};
use super::params::{ParamMeta, QueryParam};
use super::xboard::{
    api_get_subscribe, api_login, download_subscription, API_TIMEOUT, UA_FORWARD_SENTINEL,
};
use super::{Panel, PanelContext, Subscription};

const PARAMS: &[QueryParam] = &[
    QueryParam::new(
        "baseurl",
        ParamMeta::optional().with_default("https://www.netsyo.com"),
    ),
    QueryParam::new(
        "email",
        ParamMeta::required().with_example("user@example.com"),
    ),
    QueryParam::new("password", ParamMeta::required()),
    QueryParam::new("ua", ParamMeta::optional().with_default(UA_FORWARD_SENTINEL)),
];

/// Lift the provider's subscription-download restriction
///
/// Succeeds iff the response's `data` field equals `1`.
async fn api_unlock_subscribe(
    http: &PanelHttp,
    baseurl: &str,
    auth_data: &str,
    ua: &str,
) -> PanelResult<()> {
    let url = format!("{baseurl}/api/v1/user/bootstrap");

    let body = http
        .post_form(
            &url,
            &[("use", "netsyo")],
            &[("authorization", auth_data), ("user-agent", ua)],
            API_TIMEOUT,
            "subscription unlock request",
            "subscription",
        )
        .await?;

    let json = parse_json(&body, "subscription")?;
    if json["data"] == 1 {
        debug!("subscription restriction unlocked");
        Ok(())
    } else {
        Err(PanelError::UnlockFailed)
    }
}

/// Dynamic subscription fetcher for Netsyo providers
#[derive(Debug, Default)]
pub struct Netsyo;

#[async_trait]
impl Panel for Netsyo {
    fn id(&self) -> &'static str {
        "netsyo"
    }

    fn description(&self) -> &'static str {
        "Dynamic subscription fetcher for Netsyo providers"
    }

    fn query_params(&self) -> &[QueryParam] {
        PARAMS
    }

    async fn fetch(
        &self,
        ctx: &PanelContext,
        params: &HashMap<String, String>,
    ) -> PanelResult<Subscription> {
        let baseurl = params["baseurl"].trim_end_matches('/').to_string();
        let ua = params
            .get("ua")
            .map_or(UA_FORWARD_SENTINEL, String::as_str)
            .to_string();

        let auth_data = api_login(
            &ctx.http,
            &baseurl,
            &params["email"],
            &params["password"],
            &ua,
        )
        .await?;

        api_unlock_subscribe(&ctx.http, &baseurl, &auth_data, &ua).await?;

        let subscribe_url = api_get_subscribe(&ctx.http, &baseurl, &auth_data, &ua).await?;
        let fetched =
            download_subscription(&ctx.http, &subscribe_url, &ua, ctx.fetch_timeout).await?;

        Ok(Subscription {
            body: fetched.body,
            content_type: fetched.content_type,
        })
    }
}
