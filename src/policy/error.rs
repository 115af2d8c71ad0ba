//! Error types for nameserver-policy application
//!
//! A policy application can fail on the document shape (missing policy or
//! proxy list) or on an individual substitution (bad server spec, failed
//! resolution). The two kinds map to different HTTP classes upstream:
//! document and spec problems are input errors, resolution problems are
//! upstream-dependency errors.

use thiserror::Error;

use crate::dns::ResolveError;

/// Error type for policy matching and address substitution
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The document has no `dns.nameserver-policy` mapping
    #[error("dns.nameserver-policy is missing in configuration document")]
    MissingPolicy,

    /// The document has no usable `proxies` sequence
    #[error("proxies list is missing or invalid in configuration document")]
    MissingProxies,

    /// Substituting one proxy's address failed
    ///
    /// Fatal to the whole batch: remaining proxies are not processed.
    #[error("failed to substitute address for proxy '{host}': {source}")]
    Substitution {
        /// Hostname of the proxy being substituted
        host: String,
        /// The underlying spec or resolution failure
        #[source]
        source: ResolveError,
    },
}

impl PolicyError {
    /// Create a substitution error wrapping a resolver failure
    pub fn substitution(host: impl Into<String>, source: ResolveError) -> Self {
        Self::Substitution {
            host: host.into(),
            source,
        }
    }

    /// Check whether this error stems from talking to an upstream DNS server
    ///
    /// `false` means a document-shape or spec-syntax problem: the input was
    /// bad, not the dependency.
    #[must_use]
    pub fn is_resolution(&self) -> bool {
        match self {
            Self::Substitution { source, .. } => !source.is_invalid_spec(),
            Self::MissingPolicy | Self::MissingProxies => false,
        }
    }
}

/// Type alias for Result with [`PolicyError`]
pub type PolicyResult<T> = std::result::Result<T, PolicyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_policy_is_not_resolution() {
        assert!(!PolicyError::MissingPolicy.is_resolution());
        assert!(!PolicyError::MissingProxies.is_resolution());
    }

    #[test]
    fn test_invalid_spec_is_not_resolution() {
        let err = PolicyError::substitution(
            "node.example.com",
            ResolveError::invalid_spec("rcode://refused", "rcode-type spec cannot be resolved"),
        );
        assert!(!err.is_resolution());
        assert!(err.to_string().contains("node.example.com"));
    }

    #[test]
    fn test_resolution_failure_classification() {
        let err = PolicyError::substitution(
            "node.example.com",
            ResolveError::no_records("node.example.com", "udp://8.8.8.8:53"),
        );
        assert!(err.is_resolution());
        assert!(err.to_string().contains("no A records"));
    }
}
