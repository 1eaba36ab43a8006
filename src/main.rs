use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use bizdesk_api::auth::{
    InternalTokenService, MemoryPermissionStore, PermissionStore, PgPermissionStore, ProviderVerifier, TokenVerifier,
};
use bizdesk_api::config::{self, AppConfig};
use bizdesk_api::database::{register_standard_sources, DatabaseManager};
use bizdesk_api::is_development;
use bizdesk_api::registry::DependencyRegistry;
use bizdesk_api::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, AZURE_*, JWT_SECRET
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting Bizdesk API in {:?} mode", config.environment);

    let state = build_state(config).await?;
    let database = state.database.clone();
    let app = server::app(state, config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Bizdesk API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(database) = database {
        database.close().await;
    }
    Ok(())
}

async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    if config.auth.azure_tenant_id.is_empty() || config.auth.azure_client_id.is_empty() {
        tracing::warn!("AZURE_TENANT_ID / AZURE_CLIENT_ID not set; only internal tokens will verify");
    }
    if config.auth.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET not set; internal tokens can be neither issued nor verified");
    }

    let tokens = Arc::new(InternalTokenService::from_config(&config.auth));
    let provider =
        ProviderVerifier::from_config(&config.auth, &config.security).context("failed to configure identity provider")?;
    let verifier = Arc::new(TokenVerifier::new(provider, tokens.clone()));
    let registry = Arc::new(DependencyRegistry::new());

    let (database, permissions): (Option<DatabaseManager>, Arc<dyn PermissionStore>) = match &config.database.url {
        Some(_) => {
            let database = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            register_standard_sources(&registry, database.pool()).context("failed to register dependency modules")?;
            let permissions: Arc<dyn PermissionStore> = Arc::new(PgPermissionStore::new(database.pool().clone()));
            (Some(database), permissions)
        }
        None => {
            if is_development!() {
                tracing::warn!("DATABASE_URL not set; using in-memory permissions and no dependency modules");
            } else {
                tracing::error!("DATABASE_URL not set outside development; provider users will have no permissions");
            }
            let permissions: Arc<dyn PermissionStore> = Arc::new(MemoryPermissionStore::new());
            (None, permissions)
        }
    };

    tracing::info!(
        "Registered {} dependency module(s); internal token permissions from {:?}",
        registry.len(),
        config.auth.internal_permissions
    );

    Ok(AppState {
        verifier,
        tokens,
        permissions,
        registry,
        database,
        internal_permissions: config.auth.internal_permissions,
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
