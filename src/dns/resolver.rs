//! Multi-protocol IPv4 resolver
//!
//! Resolves a domain to its A records through the server named by a
//! [`DnsServerSpec`], dispatching on the spec's transport. Results are
//! cached per `(server, domain)`; a cache hit short-circuits all network
//! activity.
//!
//! Dispatch is an explicit `match` over the five transports rather than a
//! trait object: the set is closed and each arm has a different
//! connection-setup contract, HTTPS most of all since it needs the full
//! endpoint URL instead of a host and port.

use std::sync::Arc;
use std::time::Duration;

use hickory_proto::op::{Message, Query};
use hickory_proto::rr::{Name, RData, RecordType};
use tokio::time::timeout;
use tracing::debug;

use super::cache::ResolveCache;
use super::client;
use super::error::{ResolveError, ResolveResult};
use super::spec::{DnsServerSpec, Transport};

/// IPv4 resolver with a shared result cache
///
/// The cache is constructed once at process start and injected here;
/// cloning the resolver is cheap and all clones share it.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use subrelay::dns::{DnsServerSpec, ResolveCache, Resolver};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = Resolver::new(Arc::new(ResolveCache::new()));
/// let spec = DnsServerSpec::parse("udp://8.8.8.8:53")?;
///
/// let addrs = resolver
///     .resolve_ipv4(&spec, "example.com", Duration::from_secs(3))
///     .await?;
/// assert!(!addrs.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Resolver {
    cache: Arc<ResolveCache>,
}

impl Resolver {
    /// Create a resolver backed by the given cache
    #[must_use]
    pub fn new(cache: Arc<ResolveCache>) -> Self {
        Self { cache }
    }

    /// Access the shared cache
    #[must_use]
    pub fn cache(&self) -> &ResolveCache {
        &self.cache
    }

    /// Resolve a domain's A records through the given server
    ///
    /// Returns the addresses in response order; the list is never empty.
    /// The whole exchange, connection setup included, is bounded by
    /// `query_timeout`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Timeout`] when the exchange exceeds the budget
    /// - [`ResolveError::Query`] on any transport-level failure
    /// - [`ResolveError::NoRecords`] when the answer section holds no A
    ///   records
    pub async fn resolve_ipv4(
        &self,
        spec: &DnsServerSpec,
        domain: &str,
        query_timeout: Duration,
    ) -> ResolveResult<Vec<String>> {
        if let Some(addrs) = self.cache.get(&spec.raw, domain) {
            debug!(server = %spec.raw, domain, "resolution cache hit");
            return Ok(addrs);
        }

        let query = build_a_query(domain, &spec.raw)?;

        let exchange = async {
            match spec.transport {
                Transport::Udp => client::query_udp(spec, &query, domain).await,
                Transport::Tcp => client::query_tcp(spec, &query, domain).await,
                Transport::Tls => client::query_tls(spec, &query, domain).await,
                Transport::Https => client::query_https(spec, &query, domain).await,
                Transport::Quic => client::query_quic(spec, &query, domain).await,
            }
        };

        let response = timeout(query_timeout, exchange)
            .await
            .map_err(|_| ResolveError::timeout(domain, &spec.raw, query_timeout))??;

        let addrs = extract_ipv4(&response);
        if addrs.is_empty() {
            return Err(ResolveError::no_records(domain, &spec.raw));
        }

        debug!(
            server = %spec.raw,
            domain,
            count = addrs.len(),
            "resolved addresses"
        );
        self.cache.insert(&spec.raw, domain, addrs.clone());

        Ok(addrs)
    }
}

/// Build a standard A-record query for a domain
fn build_a_query(domain: &str, server: &str) -> ResolveResult<Message> {
    let name = Name::from_utf8(domain)
        .map_err(|e| ResolveError::query(domain, server, format!("invalid domain name: {e}")))?;
    let name = if name.is_fqdn() {
        name
    } else {
        name.append_domain(&Name::root())
            .map_err(|e| ResolveError::query(domain, server, format!("invalid domain name: {e}")))?
    };

    let mut message = Message::new();
    message.set_id(rand::random());
    message.set_recursion_desired(true);
    message.add_query(Query::query(name, RecordType::A));
    Ok(message)
}

/// Collect every A record from the answer section, in response order
fn extract_ipv4(response: &Message) -> Vec<String> {
    response
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            Some(RData::A(addr)) => Some(addr.0.to_string()),
            _ => None,
        })
        .collect()
}
