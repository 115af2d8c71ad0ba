//! Error types for the DNS resolution module
//!
//! Two failure families exist: a server spec can be rejected before any
//! network activity (`InvalidSpec`), or a query can fail at the transport
//! layer (`Query`, `Timeout`, `NoRecords`). The policy layer relies on this
//! split to decide between client-input and upstream-dependency responses.
//!
//! # Example
//!
//! ```
//! use subrelay::dns::ResolveError;
//!
//! let err = ResolveError::invalid_spec("rcode://refused", "rcode-type spec cannot be resolved");
//! assert!(err.is_invalid_spec());
//! assert!(err.to_string().contains("rcode://refused"));
//! ```

use std::time::Duration;

use thiserror::Error;

/// Error type for DNS server spec parsing and resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The server spec string is syntactically invalid or denotes a
    /// non-resolvable server type (rcode/system/dhcp)
    #[error("invalid DNS server spec '{spec}': {reason}")]
    InvalidSpec {
        /// The offending spec string as given by the caller
        spec: String,
        /// Why the spec was rejected
        reason: String,
    },

    /// A transport-level failure while querying the server
    #[error("DNS query for {domain} via {server} failed: {reason}")]
    Query {
        /// The domain being resolved
        domain: String,
        /// The normalized server spec string
        server: String,
        /// Description of the transport failure
        reason: String,
    },

    /// The query did not complete within the per-call timeout
    #[error("DNS query for {domain} via {server} timed out after {timeout:?}")]
    Timeout {
        /// The domain being resolved
        domain: String,
        /// The normalized server spec string
        server: String,
        /// The timeout that was exceeded
        timeout: Duration,
    },

    /// The response carried no A records in its answer section
    #[error("no A records for {domain} via {server}")]
    NoRecords {
        /// The domain being resolved
        domain: String,
        /// The normalized server spec string
        server: String,
    },
}

impl ResolveError {
    /// Create an invalid-spec error
    pub fn invalid_spec(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// Create a query error with domain and server context
    pub fn query(
        domain: impl Into<String>,
        server: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Query {
            domain: domain.into(),
            server: server.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(domain: impl Into<String>, server: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            domain: domain.into(),
            server: server.into(),
            timeout,
        }
    }

    /// Create an empty-answer error
    pub fn no_records(domain: impl Into<String>, server: impl Into<String>) -> Self {
        Self::NoRecords {
            domain: domain.into(),
            server: server.into(),
        }
    }

    /// Check whether this error was raised by the spec parser
    ///
    /// Invalid specs are client-input failures; everything else happened
    /// while talking to the upstream server.
    #[must_use]
    pub fn is_invalid_spec(&self) -> bool {
        matches!(self, Self::InvalidSpec { .. })
    }

    /// Check whether this error is a per-call timeout
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Get the domain associated with this error, if any
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        match self {
            Self::Query { domain, .. }
            | Self::Timeout { domain, .. }
            | Self::NoRecords { domain, .. } => Some(domain),
            Self::InvalidSpec { .. } => None,
        }
    }
}

/// Type alias for Result with [`ResolveError`]
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_spec_error() {
        let err = ResolveError::invalid_spec("system", "system/dhcp-type spec cannot be resolved");
        assert!(err.is_invalid_spec());
        assert!(!err.is_timeout());
        assert_eq!(err.domain(), None);
        assert!(err.to_string().contains("system"));
    }

    #[test]
    fn test_query_error() {
        let err = ResolveError::query("example.com", "udp://8.8.8.8:53", "connection refused");
        assert!(!err.is_invalid_spec());
        assert_eq!(err.domain(), Some("example.com"));
        assert!(err.to_string().contains("udp://8.8.8.8:53"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_timeout_error() {
        let err = ResolveError::timeout("example.com", "tls://1.1.1.1", Duration::from_secs(3));
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("3s"));
    }

    #[test]
    fn test_no_records_error() {
        let err = ResolveError::no_records("empty.example.com", "udp://9.9.9.9:53");
        assert_eq!(
            err.to_string(),
            "no A records for empty.example.com via udp://9.9.9.9:53"
        );
    }
}
