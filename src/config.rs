//! Service configuration
//!
//! Loads the relay's configuration from a JSON file, with environment
//! variable overrides applied on top:
//!
//! - `SUBRELAY_LISTEN`: listen address
//! - `SUBRELAY_DNS_TIMEOUT`: per-lookup DNS timeout in seconds
//! - `SUBRELAY_LOG_LEVEL`: tracing filter directive

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Default per-lookup DNS timeout in seconds
pub const DEFAULT_DNS_TIMEOUT_SECS: u64 = 3;

/// Default subscription download timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Relay service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Address the HTTP API listens on
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Per-lookup DNS timeout in seconds
    #[serde(default = "default_dns_timeout")]
    pub dns_timeout_secs: u64,

    /// Timeout for downloading subscription content, in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Tracing filter directive (e.g. `info`, `subrelay=debug`)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen() -> SocketAddr {
    "127.0.0.1:8000".parse().expect("valid default address")
}

fn default_dns_timeout() -> u64 {
    DEFAULT_DNS_TIMEOUT_SECS
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            dns_timeout_secs: default_dns_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            log_level: default_log_level(),
        }
    }
}

impl RelayConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if either timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dns_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "dns_timeout_secs".into(),
                reason: "must be positive".into(),
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch_timeout_secs".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Load configuration from a JSON file
///
/// # Errors
///
/// Returns `ConfigError` if the file is missing, unreadable, unparseable,
/// or fails validation.
pub fn load_config(path: impl AsRef<Path>) -> Result<RelayConfig, ConfigError> {
    let path = path.as_ref();
    debug!("loading configuration from {:?}", path);

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;
    let config: RelayConfig = serde_json::from_str(&contents)
        .map_err(|e| ConfigError::Parse(format!("failed to parse JSON: {e} at {path:?}")))?;

    config.validate()?;
    Ok(config)
}

/// Apply `SUBRELAY_*` environment overrides to a configuration
///
/// # Errors
///
/// Returns `ConfigError` if an override has an unparseable value or the
/// result fails validation.
pub fn apply_env_overrides(mut config: RelayConfig) -> Result<RelayConfig, ConfigError> {
    if let Ok(listen) = std::env::var("SUBRELAY_LISTEN") {
        config.listen = listen.parse().map_err(|_| ConfigError::Env {
            name: "SUBRELAY_LISTEN".into(),
            reason: format!("invalid socket address: {listen}"),
        })?;
        debug!("listen address overridden to {}", config.listen);
    }

    if let Ok(timeout) = std::env::var("SUBRELAY_DNS_TIMEOUT") {
        config.dns_timeout_secs = timeout.parse().map_err(|_| ConfigError::Env {
            name: "SUBRELAY_DNS_TIMEOUT".into(),
            reason: format!("invalid number: {timeout}"),
        })?;
        debug!("DNS timeout overridden to {}s", config.dns_timeout_secs);
    }

    if let Ok(level) = std::env::var("SUBRELAY_LOG_LEVEL") {
        config.log_level = level;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from an optional file, then the environment
///
/// With no file, overrides apply on top of the defaults.
///
/// # Errors
///
/// Returns `ConfigError` on any load, parse, or validation failure.
pub fn load(path: Option<&str>) -> Result<RelayConfig, ConfigError> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    apply_env_overrides(config)
}
