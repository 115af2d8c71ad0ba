//! Aladdin Network panel provider
//!
//! XBoard flow pinned to the provider's expected Clash client User-Agent,
//! followed by the nameserver-policy rewrite: the downloaded Clash document
//! gets each matching proxy's `server` hostname replaced with an IPv4
//! address resolved through the DNS server its policy entry names.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use super::error::{PanelError, PanelResult};
use super::params::{ParamMeta, QueryParam};
use super::xboard::fetch_xboard;
use super::{Panel, PanelContext, Subscription};
use crate::policy::apply_policy;

/// The provider only serves Clash configs to this client
const CLASH_USER_AGENT: &str = "ClashforWindows/0.20.39";

const PARAMS: &[QueryParam] = &[
    QueryParam::new(
        "baseurl",
        ParamMeta::optional().with_default("https://openapi.kdcloud.uk"),
    ),
    QueryParam::new(
        "email",
        ParamMeta::required().with_example("user@example.com"),
    ),
    QueryParam::new("password", ParamMeta::required()),
];

/// Rewrite the document's proxies per its nameserver policy
///
/// Parses the YAML, applies the policy, and re-serializes with the outer
/// key order intact.
pub(crate) async fn rewrite_subscription(
    ctx: &PanelContext,
    yaml_text: &str,
) -> PanelResult<String> {
    let mut doc: serde_yaml::Value =
        serde_yaml::from_str(yaml_text).map_err(|e| PanelError::bad_document(e.to_string()))?;

    let substituted = apply_policy(&mut doc, &ctx.resolver, ctx.dns_timeout).await?;
    info!(substituted, "applied nameserver policy to subscription");

    serde_yaml::to_string(&doc).map_err(|e| PanelError::internal(e.to_string()))
}

/// Aladdin Network Clash subscription fetcher with DNS replacement
#[derive(Debug, Default)]
pub struct AladdinNetwork;

#[async_trait]
impl Panel for AladdinNetwork {
    fn id(&self) -> &'static str {
        "aladdinnet"
    }

    fn description(&self) -> &'static str {
        "Aladdin Network Clash subscription fetcher with DNS replacement"
    }

    fn query_params(&self) -> &[QueryParam] {
        PARAMS
    }

    async fn fetch(
        &self,
        ctx: &PanelContext,
        params: &HashMap<String, String>,
    ) -> PanelResult<Subscription> {
        let subscription = fetch_xboard(ctx, params, CLASH_USER_AGENT).await?;

        let yaml_text = String::from_utf8_lossy(&subscription.body).into_owned();
        let rewritten = rewrite_subscription(ctx, &yaml_text).await?;

        Ok(Subscription {
            body: Bytes::from(rewritten),
            content_type: Some("text/yaml; charset=utf-8".to_string()),
        })
    }
}
