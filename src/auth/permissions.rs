use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PermissionStoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistent source of per-user permission strings
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn permissions_for(&self, subject: &str) -> Result<Vec<String>, PermissionStoreError>;
}

/// Reads `user_permissions(user_id, permission)` rows
pub struct PgPermissionStore {
    pool: PgPool,
}

impl PgPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionStore for PgPermissionStore {
    async fn permissions_for(&self, subject: &str) -> Result<Vec<String>, PermissionStoreError> {
        let query = r#"
            SELECT DISTINCT permission
            FROM user_permissions
            WHERE user_id = $1
            ORDER BY permission
        "#;

        let rows: Vec<(String,)> = sqlx::query_as(query).bind(subject).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(permission,)| permission).collect())
    }
}

/// In-process permission table, used when no database is configured
#[derive(Default)]
pub struct MemoryPermissionStore {
    grants: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant<I, S>(&self, subject: &str, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut grants = self.grants.write().unwrap_or_else(|e| e.into_inner());
        let entry = grants.entry(subject.to_string()).or_default();
        for permission in permissions {
            let permission = permission.into();
            if !entry.contains(&permission) {
                entry.push(permission);
            }
        }
    }

    pub fn revoke_all(&self, subject: &str) {
        let mut grants = self.grants.write().unwrap_or_else(|e| e.into_inner());
        grants.remove(subject);
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn permissions_for(&self, subject: &str) -> Result<Vec<String>, PermissionStoreError> {
        let grants = self.grants.read().unwrap_or_else(|e| e.into_inner());
        Ok(grants.get(subject).cloned().unwrap_or_default())
    }
}
