use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::auth::{self, IdentitySource, SessionIdentity};
use crate::error::ApiError;

/// The authenticated caller, as injected by the auth middleware
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub identity: SessionIdentity,
    pub source: IdentitySource,
}

impl CurrentUser {
    /// 403 unless the caller holds one of `roles`
    pub fn require_role<S: AsRef<str>>(&self, roles: &[S]) -> Result<(), ApiError> {
        auth::require_role(Some(&self.identity), roles).map_err(|e| self.denied(e))
    }

    /// 403 unless the caller is an admin or holds one of `permissions`
    pub fn require_permission<S: AsRef<str>>(&self, permissions: &[S]) -> Result<(), ApiError> {
        auth::require_permission(Some(&self.identity), permissions).map_err(|e| self.denied(e))
    }

    fn denied(&self, err: auth::AccessError) -> ApiError {
        tracing::info!("Access denied for '{}': {}", self.identity.id, err);
        err.into()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts.extensions.get::<SessionIdentity>().cloned();
        let source = parts.extensions.get::<IdentitySource>().copied();

        match (identity, source) {
            (Some(identity), Some(source)) => Ok(Self { identity, source }),
            _ => Err(auth::AccessError::Unauthenticated.into()),
        }
    }
}
