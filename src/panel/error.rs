//! Error types for panel providers
//!
//! Panel failures split into two HTTP classes: the provider answered but
//! with something unusable (500-class, the relay's dependency misbehaved in
//! a way worth reporting verbatim) and the provider could not be reached or
//! spoke garbage (502-class). Policy failures inherit their own
//! validation/resolution split.

use http::StatusCode;
use thiserror::Error;

use crate::policy::PolicyError;

/// Error type for panel login, fetch, and rewrite operations
#[derive(Debug, Error)]
pub enum PanelError {
    /// The provider answered an API call with a non-success status
    #[error("{action} failed, server returned status code {status}")]
    UpstreamStatus {
        /// What was being attempted, e.g. "authentication request"
        action: &'static str,
        /// The HTTP status the provider returned
        status: u16,
    },

    /// The provider could not be reached (network error or timeout)
    #[error("unable to connect to {service} service")]
    Unreachable {
        /// Which provider endpoint was involved
        service: &'static str,
        /// Underlying transport failure
        reason: String,
    },

    /// The provider's response body was not valid JSON
    #[error("invalid JSON response from {service} service")]
    InvalidJson {
        /// Which provider endpoint was involved
        service: &'static str,
    },

    /// Login succeeded but the response carried no token
    #[error("authentication succeeded but token is missing in response")]
    MissingToken,

    /// The subscription info response carried no URL
    #[error("subscription URL not found in response")]
    MissingSubscribeUrl,

    /// The provider's subscription-unlock step did not succeed
    #[error("failed to unlock subscription restriction")]
    UnlockFailed,

    /// The downloaded subscription content could not be parsed
    #[error("failed to parse subscription content: {reason}")]
    BadDocument {
        /// Parser failure description
        reason: String,
    },

    /// Address substitution on the subscription document failed
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Request construction or other internal failure
    #[error("internal relay error: {reason}")]
    Internal {
        /// Failure description
        reason: String,
    },
}

impl PanelError {
    /// Create an unreachable-service error
    pub fn unreachable(service: &'static str, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            service,
            reason: reason.into(),
        }
    }

    /// Create a bad-document error
    pub fn bad_document(reason: impl Into<String>) -> Self {
        Self::BadDocument {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// HTTP status this error maps to at the relay's surface
    ///
    /// Connectivity and malformed-response failures are 502 (the dependency
    /// is unreachable or broken); everything the provider answered
    /// deliberately, plus input-shaped policy failures, is 500. A policy
    /// failure caused by an upstream DNS server is 502.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unreachable { .. } | Self::InvalidJson { .. } => StatusCode::BAD_GATEWAY,
            Self::Policy(policy) if policy.is_resolution() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Type alias for Result with [`PanelError`]
pub type PanelResult<T> = std::result::Result<T, PanelError>;
