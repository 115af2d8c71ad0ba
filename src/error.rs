//! Crate-level error types
//!
//! Module-specific errors live next to their modules
//! ([`crate::dns::ResolveError`], [`crate::policy::PolicyError`],
//! [`crate::panel::PanelError`]); this module holds the configuration error
//! and the umbrella type the binary reports.

use std::io;

use thiserror::Error;

use crate::panel::PanelError;
use crate::policy::PolicyError;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path that was looked up
        path: String,
    },

    /// Reading the configuration file failed
    #[error("failed to read configuration: {0}")]
    Io(#[from] io::Error),

    /// The configuration file is not valid JSON
    #[error("configuration parse error: {0}")]
    Parse(String),

    /// A configuration value is out of range
    #[error("invalid configuration: {field}: {reason}")]
    Invalid {
        /// The offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// An environment override has an unusable value
    #[error("invalid environment variable {name}: {reason}")]
    Env {
        /// The environment variable name
        name: String,
        /// Why its value was rejected
        reason: String,
    },
}

/// Umbrella error for the relay binary
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration failure
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Panel failure
    #[error(transparent)]
    Panel(#[from] PanelError),

    /// Policy failure
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Server socket failure
    #[error("server error: {0}")]
    Server(#[from] io::Error),
}
