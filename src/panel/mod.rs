//! Subscription panel providers
//!
//! A panel logs into a provider's API, retrieves the user's subscription
//! URL, and relays the downloaded document. Providers are a closed set
//! registered explicitly at process start:
//!
//! - [`xboard::XBoard`]: the generic XBoard login/fetch flow
//! - [`netsyo::Netsyo`]: XBoard plus a subscription-unlock step
//! - [`aladdin::AladdinNetwork`]: XBoard plus nameserver-policy rewriting
//!
//! # Example
//!
//! ```
//! use subrelay::panel::PanelRegistry;
//!
//! let registry = PanelRegistry::with_builtin();
//! assert_eq!(registry.ids(), vec!["xboard", "netsyo", "aladdinnet"]);
//! assert!(registry.get("aladdinnet").is_some());
//! ```

pub mod aladdin;
pub mod error;
pub mod http;
pub mod netsyo;
pub mod params;
pub mod xboard;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

pub use aladdin::AladdinNetwork;
pub use error::{PanelError, PanelResult};
pub use http::PanelHttp;
pub use netsyo::Netsyo;
pub use params::{help_doc, validate, ParamIssue, ParamMeta, QueryParam};
pub use xboard::{XBoard, UA_FORWARD_SENTINEL};

use crate::dns::Resolver;

/// A fetched subscription ready to relay to the caller
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Response body, relayed verbatim unless the panel rewrites it
    pub body: Bytes,
    /// Content type to serve the body with
    pub content_type: Option<String>,
}

/// Shared services handed to every panel invocation
#[derive(Debug, Clone)]
pub struct PanelContext {
    /// HTTPS client for provider APIs
    pub http: PanelHttp,
    /// Resolver used by policy-rewriting panels
    pub resolver: Resolver,
    /// Per-lookup DNS timeout
    pub dns_timeout: Duration,
    /// Timeout for downloading subscription content
    pub fetch_timeout: Duration,
}

/// A subscription provider
///
/// Implementations declare their query parameters up front and perform the
/// provider-specific fetch flow in [`fetch`](Panel::fetch). Parameters
/// arrive already validated and with defaults applied.
#[async_trait]
pub trait Panel: Send + Sync {
    /// Stable identifier used in request paths
    fn id(&self) -> &'static str;

    /// One-line human-readable description
    fn description(&self) -> &'static str;

    /// Ordered query parameter declarations
    fn query_params(&self) -> &[QueryParam];

    /// Execute the provider flow and return the subscription
    async fn fetch(
        &self,
        ctx: &PanelContext,
        params: &HashMap<String, String>,
    ) -> PanelResult<Subscription>;
}

/// Ordered registry of the known panels
///
/// Populated once at startup by explicit registration; lookup is by id and
/// listing preserves registration order.
#[derive(Default)]
pub struct PanelRegistry {
    panels: Vec<Arc<dyn Panel>>,
}

impl PanelRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in panels
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(XBoard));
        registry.register(Arc::new(Netsyo));
        registry.register(Arc::new(AladdinNetwork));
        registry
    }

    /// Register a panel
    ///
    /// A panel re-registering an existing id replaces the old entry in
    /// place, keeping its position.
    pub fn register(&mut self, panel: Arc<dyn Panel>) {
        if let Some(existing) = self.panels.iter_mut().find(|p| p.id() == panel.id()) {
            *existing = panel;
        } else {
            self.panels.push(panel);
        }
    }

    /// Look up a panel by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&dyn Panel> {
        self.panels
            .iter()
            .find(|panel| panel.id() == id)
            .map(AsRef::as_ref)
    }

    /// Panel ids in registration order
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        self.panels.iter().map(|panel| panel.id()).collect()
    }
}

impl std::fmt::Debug for PanelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelRegistry")
            .field("panels", &self.ids())
            .finish()
    }
}
