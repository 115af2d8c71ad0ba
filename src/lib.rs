//! subrelay: Clash subscription relay with nameserver-policy rewriting
//!
//! This crate relays subscription documents from provider panels and
//! rewrites Clash proxy configurations: each proxy hostname matched by the
//! document's `dns.nameserver-policy` is resolved through the DNS server
//! its policy entry names and replaced with the first IPv4 address.
//!
//! # Architecture
//!
//! ```text
//! Client → GET /board/<name> → Panel (login → subscribe → download)
//!                                 │
//!                                 ▼ (Clash providers)
//!                         Policy substitution
//!                    per proxy: match pattern → parse spec
//!                                 │
//!                                 ▼
//!                   Resolver (cache → udp/tcp/tls/https/quic)
//! ```
//!
//! # Modules
//!
//! - [`config`]: service configuration with env overrides
//! - [`dns`]: server-spec parsing, multi-protocol resolution, result cache
//! - [`policy`]: wildcard matching and proxy address substitution
//! - [`panel`]: subscription provider flows and registry
//! - [`server`]: the HTTP API
//! - [`error`]: configuration and umbrella error types
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use subrelay::dns::{DnsServerSpec, ResolveCache, Resolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = Resolver::new(Arc::new(ResolveCache::new()));
//! let spec = DnsServerSpec::parse("tls://1.1.1.1")?;
//! let addrs = resolver
//!     .resolve_ipv4(&spec, "example.com", Duration::from_secs(3))
//!     .await?;
//! println!("resolved: {addrs:?}");
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod dns;
pub mod error;
pub mod panel;
pub mod policy;
pub mod server;

// Re-export commonly used types at the crate root
pub use config::RelayConfig;
pub use dns::{DnsServerSpec, ResolveCache, ResolveError, Resolver, Transport};
pub use error::{ConfigError, RelayError};
pub use panel::{Panel, PanelContext, PanelError, PanelRegistry, Subscription};
pub use policy::{apply_policy, PolicyError};
pub use server::{app, AppState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
