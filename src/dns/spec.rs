//! DNS server spec parsing
//!
//! Parses the server address strings found in a Clash `nameserver-policy`
//! into a transport, host, and port:
//!
//! - `8.8.8.8` or `8.8.8.8:5353` - plain UDP
//! - `udp://...` / `tcp://...` - explicit plain transports
//! - `tls://...` - DNS over TLS (default port 853)
//! - `https://.../dns-query` - DNS over HTTPS (the full URL is kept)
//! - `quic://...` - DNS over QUIC
//!
//! `rcode://...` specs synthesize a fixed response code instead of looking
//! anything up, and `system`, `system://...`, `dhcp://...` delegate to the
//! OS resolver; none of them carry a resolvable address, so all four are
//! rejected up front.

use std::fmt;

use http::Uri;

use super::error::{ResolveError, ResolveResult};

/// Default port for plain and QUIC DNS transports
const DEFAULT_DNS_PORT: u16 = 53;

/// Default port for DNS over TLS (RFC 7858)
const DEFAULT_TLS_PORT: u16 = 853;

/// Wire transport for an upstream DNS server
///
/// A closed set: every variant has a materially different connection-setup
/// contract, and adding one requires a matching change in the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Plain UDP (RFC 1035)
    Udp,
    /// Plain TCP (RFC 1035, 2-byte length prefix)
    Tcp,
    /// DNS over TLS (RFC 7858)
    Tls,
    /// DNS over HTTPS (RFC 8484); queries go to the full endpoint URL
    Https,
    /// DNS over QUIC (RFC 9250)
    Quic,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => write!(f, "udp"),
            Self::Tcp => write!(f, "tcp"),
            Self::Tls => write!(f, "tls"),
            Self::Https => write!(f, "https"),
            Self::Quic => write!(f, "quic"),
        }
    }
}

/// Parsed representation of a DNS server address string
///
/// # Invariant
///
/// `host` is non-empty and `transport` is one of the five supported
/// transports; specs that cannot be resolved never produce a value.
///
/// # Example
///
/// ```
/// use subrelay::dns::{DnsServerSpec, Transport};
///
/// let spec = DnsServerSpec::parse("tls://1.1.1.1").unwrap();
/// assert_eq!(spec.transport, Transport::Tls);
/// assert_eq!(spec.host, "1.1.1.1");
/// assert_eq!(spec.port, 853);
/// assert_eq!(spec.raw, "tls://1.1.1.1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsServerSpec {
    /// Wire transport to use
    pub transport: Transport,
    /// Server hostname or IP address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Normalized (trimmed, lower-cased) original string
    ///
    /// Used as the cache-key component, and as the full endpoint URL for
    /// the `https` transport where the path matters.
    pub raw: String,
}

impl DnsServerSpec {
    /// Parse a DNS server spec string
    ///
    /// The input is trimmed and lower-cased first; parsing is
    /// case-insensitive and deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidSpec`] for rcode/system/dhcp specs,
    /// unsupported transports, non-numeric ports, and empty hosts.
    ///
    /// # Example
    ///
    /// ```
    /// use subrelay::dns::{DnsServerSpec, Transport};
    ///
    /// let spec = DnsServerSpec::parse("8.8.8.8:5353").unwrap();
    /// assert_eq!(spec.transport, Transport::Udp);
    /// assert_eq!(spec.port, 5353);
    ///
    /// assert!(DnsServerSpec::parse("rcode://success").is_err());
    /// ```
    pub fn parse(server_spec: &str) -> ResolveResult<Self> {
        let raw = server_spec.trim().to_lowercase();

        if raw.starts_with("rcode://") {
            return Err(ResolveError::invalid_spec(
                &raw,
                "rcode-type spec cannot be resolved",
            ));
        }

        if raw.starts_with("system://") || raw == "system" || raw.starts_with("dhcp://") {
            return Err(ResolveError::invalid_spec(
                &raw,
                "system/dhcp-type spec cannot be resolved",
            ));
        }

        // No scheme: implicit UDP, optionally with a port suffix.
        if !raw.contains("://") {
            let (host, port) = match raw.split_once(':') {
                Some((host, port_str)) => {
                    let port = port_str.parse::<u16>().map_err(|_| {
                        ResolveError::invalid_spec(&raw, format!("invalid port '{port_str}'"))
                    })?;
                    (host.trim().to_string(), port)
                }
                None => (raw.clone(), DEFAULT_DNS_PORT),
            };

            if host.is_empty() {
                return Err(ResolveError::invalid_spec(&raw, "missing host"));
            }

            return Ok(Self {
                transport: Transport::Udp,
                host,
                port,
                raw,
            });
        }

        let uri: Uri = raw
            .parse()
            .map_err(|e| ResolveError::invalid_spec(&raw, format!("not a valid URL: {e}")))?;

        let transport = match uri.scheme_str() {
            Some("udp") => Transport::Udp,
            Some("tcp") => Transport::Tcp,
            Some("tls") => Transport::Tls,
            Some("https") => Transport::Https,
            Some("quic") => Transport::Quic,
            _ => return Err(ResolveError::invalid_spec(&raw, "unsupported transport")),
        };

        let host = uri
            .host()
            .map(|h| h.trim_matches(|c| c == '[' || c == ']').to_string())
            .unwrap_or_default();
        if host.is_empty() {
            return Err(ResolveError::invalid_spec(&raw, "missing host"));
        }

        let port = uri.port_u16().unwrap_or(match transport {
            Transport::Tls => DEFAULT_TLS_PORT,
            _ => DEFAULT_DNS_PORT,
        });

        Ok(Self {
            transport,
            host,
            port,
            raw,
        })
    }
}

impl fmt::Display for DnsServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
