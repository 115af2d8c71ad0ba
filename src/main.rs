//! subrelay service binary
//!
//! Loads configuration, wires the shared resolver and panel registry, and
//! serves the HTTP API until interrupted.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use subrelay::dns::{ResolveCache, Resolver};
use subrelay::panel::{PanelContext, PanelHttp, PanelRegistry};
use subrelay::server::{app, AppState};
use subrelay::{config, RelayError};

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    // Config file path comes from the first argument, if any
    let config_path = std::env::args().nth(1);
    let config = config::load(config_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    // Single crypto provider for every rustls consumer (TLS, DoH, QUIC)
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!(version = subrelay::VERSION, listen = %config.listen, "starting subrelay");

    let cache = Arc::new(ResolveCache::new());
    let resolver = Resolver::new(Arc::clone(&cache));

    let ctx = PanelContext {
        http: PanelHttp::new()?,
        resolver,
        dns_timeout: Duration::from_secs(config.dns_timeout_secs),
        fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
    };

    let state = AppState::new(PanelRegistry::with_builtin(), ctx);
    let listener = tokio::net::TcpListener::bind(config.listen).await?;

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal(cache))
        .await?;

    Ok(())
}

async fn shutdown_signal(cache: Arc<ResolveCache>) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for shutdown signal");
    info!(
        cached_entries = cache.len(),
        cache_hits = cache.stats().hits(),
        "shutdown signal received"
    );
}
