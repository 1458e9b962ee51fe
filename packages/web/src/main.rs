use std::sync::Arc;

use anyhow::Context as _;
use api::auth::{Gate, OidcConfig, OidcProvider};
use api::{db, router, AppState, Persister, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new().context("Failed to load settings")?;
    let addr = settings.listen_address()?;
    tracing::info!(
        "Loaded settings from defaults, config.toml and environment (pool size {})",
        settings.max_connections
    );

    let pool = db::connect(&settings.postgres_url, settings.max_connections)
        .await
        .context("Failed to connect to database")?;
    db::migrate(&pool).await.context("Failed to run migrations")?;

    let oidc = OidcConfig::from_settings(&settings)?;
    let provider = OidcProvider::discover(oidc)
        .await
        .context("Failed to discover OIDC provider")?;
    tracing::info!("Using OIDC issuer {}", settings.oidc_issuer);

    let state = AppState {
        persister: Persister::new(pool),
        gate: Arc::new(Gate::new(Arc::new(provider), settings.oidc_redirect_url.trim())),
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to listen on {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
