use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::token_fingerprint;
use crate::error::ApiError;
use crate::server::AppState;

/// Bearer authentication middleware.
///
/// Runs the dual-mode verifier, resolves the identity's permissions and
/// injects `SessionIdentity` plus `IdentitySource` into request extensions.
/// Handlers behind this layer can rely on both being present.
pub async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).map_err(ApiError::unauthorized)?;

    let (mut identity, source) = state
        .verifier
        .verify(&token)
        .await
        .into_identity()
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    if source.permissions_from_store(state.internal_permissions) {
        identity.permissions = state.permissions.permissions_for(&identity.id).await?;
    }

    tracing::debug!(
        "Authenticated '{}' via {:?} token {} with {} permission(s)",
        identity.id,
        source,
        token_fingerprint(&token),
        identity.permissions.len()
    );

    request.extensions_mut().insert(identity);
    request.extensions_mut().insert(source);

    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        let token = token.trim();
        if token.is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
