use axum::extract::State;
use serde::Serialize;

use crate::auth::{IdentitySource, SessionIdentity};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    #[serde(flatten)]
    pub identity: SessionIdentity,
    pub source: IdentitySource,
}

/// GET /api/auth/whoami - the resolved identity and the path that produced it
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "id": "6f1c...", "email": "dana@contoso.com", "name": "Dana",
///     "roles": ["viewer"], "permissions": ["users:view"],
///     "source": "provider"
///   }
/// }
/// ```
pub async fn whoami(user: CurrentUser) -> ApiResult<WhoAmI> {
    Ok(ApiResponse::success(WhoAmI {
        identity: user.identity,
        source: user.source,
    }))
}

#[derive(Debug, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub identity: SessionIdentity,
}

/// POST /api/auth/token - exchange the current credentials for an internal token
///
/// The new token embeds the identity as resolved for this request, including
/// permissions loaded from the store.
pub async fn issue_token(State(state): State<AppState>, user: CurrentUser) -> ApiResult<IssuedToken> {
    let (token, identity) = state.tokens.issue(&user.identity)?;

    tracing::info!(
        "Issued internal token for '{}' (from {:?} credentials)",
        identity.id,
        user.source
    );

    Ok(ApiResponse::created(IssuedToken {
        token,
        token_type: "Bearer",
        expires_in: state.tokens.expiry_hours() * 3600,
        identity,
    }))
}
