//! Proxy address substitution driven by `dns.nameserver-policy`
//!
//! Walks the `proxies` sequence of a Clash document. For each proxy whose
//! `server` hostname matches a policy pattern (first syntactic match wins,
//! in document order), the matched entry's DNS server is queried and the
//! hostname is replaced with the first resolved address.
//!
//! Substitution is best-effort per proxy: hostnames matching no pattern
//! pass through untouched and no resolution is attempted for them. But once
//! a matched resolution is attempted and fails, the whole batch aborts and
//! later proxies are not processed. Both variants of the upstream panel
//! behave this way, so the asymmetry is kept.

use std::time::Duration;

use serde_yaml::Value;
use tracing::{debug, warn};

use super::error::{PolicyError, PolicyResult};
use super::glob::{glob_match, translate_pattern};
use crate::dns::{DnsServerSpec, Resolver};

/// One translated policy entry
struct PolicyRule {
    /// Glob pattern matched against proxy hostnames
    glob: String,
    /// DNS server spec string to resolve through on a match
    server: String,
}

/// Extract the ordered policy rules from a document
///
/// Only string-to-string entries participate; anything else (e.g. Clash's
/// list-valued policies) is skipped with a warning.
fn policy_rules(doc: &Value) -> PolicyResult<Vec<PolicyRule>> {
    let policy = doc
        .get("dns")
        .and_then(|dns| dns.get("nameserver-policy"))
        .and_then(Value::as_mapping)
        .ok_or(PolicyError::MissingPolicy)?;

    let mut rules = Vec::with_capacity(policy.len());
    for (key, value) in policy {
        let (Some(pattern), Some(server)) = (key.as_str(), value.as_str()) else {
            warn!(?key, "skipping non-string nameserver-policy entry");
            continue;
        };
        rules.push(PolicyRule {
            glob: translate_pattern(pattern),
            server: server.to_string(),
        });
    }

    Ok(rules)
}

/// Find the first policy rule matching a hostname
fn match_rule<'a>(rules: &'a [PolicyRule], hostname: &str) -> Option<&'a PolicyRule> {
    rules.iter().find(|rule| glob_match(&rule.glob, hostname))
}

/// Apply the document's nameserver policy to its proxy list
///
/// Mutates `proxies[i].server` in place and returns how many entries were
/// substituted. Proxies are processed strictly in sequence so that cache
/// entries written for one proxy are visible to the next.
///
/// # Errors
///
/// - [`PolicyError::MissingPolicy`] / [`PolicyError::MissingProxies`] when
///   the document lacks the required shape; raised before any proxy is
///   inspected
/// - [`PolicyError::Substitution`] when a matched proxy's server spec is
///   invalid or its resolution fails; aborts the remaining batch
pub async fn apply_policy(
    doc: &mut Value,
    resolver: &Resolver,
    query_timeout: Duration,
) -> PolicyResult<usize> {
    let rules = policy_rules(doc)?;

    let proxies = doc
        .get_mut("proxies")
        .and_then(Value::as_sequence_mut)
        .ok_or(PolicyError::MissingProxies)?;

    let mut substituted = 0;

    for proxy in proxies.iter_mut() {
        let Some(hostname) = proxy.get("server").and_then(Value::as_str) else {
            continue;
        };
        let hostname = hostname.to_string();

        let Some(rule) = match_rule(&rules, &hostname) else {
            continue;
        };

        let spec = DnsServerSpec::parse(&rule.server)
            .map_err(|e| PolicyError::substitution(&hostname, e))?;

        let addrs = resolver
            .resolve_ipv4(&spec, &hostname, query_timeout)
            .await
            .map_err(|e| PolicyError::substitution(&hostname, e))?;

        let Some(first) = addrs.first() else {
            continue;
        };

        debug!(server = %hostname, address = %first, "substituted proxy address");
        proxy["server"] = Value::String(first.clone());
        substituted += 1;
    }

    Ok(substituted)
}
