//! homedash server entry point.
//!
//! Loads configuration, opens the config document store, builds the config
//! engine, then starts the Axum HTTP server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use homedash_core::crypto::SecretCipher;
use homedash_core::engine::ConfigEngine;
use homedash_storage::FileStore;

use homedash_server::config::ServerConfig;
use homedash_server::routes;
use homedash_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment.
    let config = ServerConfig::from_env();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(config_path = %config.config_path.display(), "homedash starting");

    let state = build_app_state(&config)?;
    let app = routes::router(state);

    // Bind and serve.
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "homedash server listening");
    if config.is_exposed() {
        warn!(
            addr = %config.bind_addr,
            user_header = %config.principal.user_header,
            role_header = %config.principal.role_header,
            "listening on a non-loopback address; principal headers are trusted as-is, \
             only expose this port through the authenticating proxy"
        );
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("homedash server stopped");
    Ok(())
}

/// Build the shared application state.
fn build_app_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let store = Arc::new(FileStore::new(&config.config_path));
    let mut engine = ConfigEngine::new(store);

    if let Some(ref passphrase) = config.secret_key {
        let cipher = SecretCipher::from_passphrase(passphrase)
            .context("failed to derive secret sealing key from HOMEDASH_SECRET_KEY")?;
        engine = engine.with_cipher(cipher);
        info!("newly supplied secrets will be sealed at rest");
    } else {
        warn!("HOMEDASH_SECRET_KEY not set, new secrets are stored in plaintext");
    }

    Ok(Arc::new(AppState {
        engine,
        principal: config.principal.clone(),
    }))
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
