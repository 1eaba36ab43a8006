use axum::extract::State;

use crate::auth::ADMIN_ROLE;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::registry::ModuleDescriptor;
use crate::server::AppState;

/// GET /api/admin/dependency-modules - registered modules in registration order
pub async fn list(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<ModuleDescriptor>> {
    user.require_role(&[ADMIN_ROLE])?;
    Ok(ApiResponse::success(state.registry.modules()))
}
