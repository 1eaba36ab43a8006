pub mod access;
pub mod token;

use std::sync::Arc;

use crate::auth::{
    IdentitySource, InternalTokenService, PermissionStore, PgPermissionStore, ProviderVerifier, SessionIdentity,
    TokenVerifier,
};
use crate::config::AppConfig;
use crate::database::DatabaseManager;

/// Verify `token` the way the server does, including the permission lookup
/// when a database is configured
pub(crate) async fn resolve_identity(
    config: &AppConfig,
    token: &str,
) -> anyhow::Result<Option<(SessionIdentity, IdentitySource)>> {
    let tokens = Arc::new(InternalTokenService::from_config(&config.auth));
    let provider = ProviderVerifier::from_config(&config.auth, &config.security)?;
    let verifier = TokenVerifier::new(provider, tokens);

    let Some((mut identity, source)) = verifier.verify(token).await.into_identity() else {
        return Ok(None);
    };

    if source.permissions_from_store(config.auth.internal_permissions) {
        match config.database.url {
            Some(_) => {
                let database = DatabaseManager::connect(&config.database).await?;
                let store = PgPermissionStore::new(database.pool().clone());
                identity.permissions = store.permissions_for(&identity.id).await?;
                database.close().await;
            }
            None => tracing::warn!("DATABASE_URL not set; permissions for '{}' not loaded", identity.id),
        }
    }

    Ok(Some((identity, source)))
}
