//! # Storefront API Server
//!
//! ```text
//! load config ──► open database (migrations) ──► HTTP gateway client
//!      ──► AppState ──► axum::serve ──► Ctrl+C / SIGTERM ──► close pool
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storefront_api::{build_router, ApiConfig, AppState, PaymentSettings};
use storefront_db::Database;
use storefront_payments::HttpPaymentGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,storefront=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting storefront API server...");

    let config = ApiConfig::load().context("loading configuration")?;
    let addr = config.bind_addr()?;
    info!(
        %addr,
        database = %config.database.path.display(),
        gateway = %config.gateway.url,
        currency = %config.gateway.currency,
        "Configuration loaded"
    );

    let db = Database::new(config.db_config())
        .await
        .context("opening database")?;
    info!("Database ready");

    let gateway = HttpPaymentGateway::new(
        config.gateway.url.clone(),
        config.gateway.secret_key.clone(),
        config.gateway_timeout(),
    )
    .context("building payment gateway client")?;

    let state = AppState::new(
        db.clone(),
        Arc::new(gateway),
        PaymentSettings {
            currency: config.gateway.currency.clone(),
            gateway_timeout: config.gateway_timeout(),
            webhook_secret: config.webhook.secret.clone(),
            webhook_tolerance: config.webhook_tolerance(),
        },
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
