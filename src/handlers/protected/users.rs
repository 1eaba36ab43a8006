use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::registry::{ReassignmentCount, ReassignmentFailure, UserDependencies};
use crate::server::AppState;

pub const VIEW_PERMISSION: &str = "users:view";
pub const EDIT_PERMISSION: &str = "users:edit";

#[derive(Debug, Deserialize)]
pub struct DependencyQuery {
    /// Display name echoed back in the report
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DependencyReport {
    #[serde(flatten)]
    pub dependencies: UserDependencies,
    pub summary: String,
}

/// GET /api/users/:id/dependencies - records the user owns across modules
pub async fn dependencies(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<String>,
    Query(query): Query<DependencyQuery>,
) -> ApiResult<DependencyReport> {
    user.require_permission(&[VIEW_PERMISSION])?;

    let user_name = query.name.unwrap_or_else(|| user_id.clone());
    let dependencies = state.registry.query_dependencies(&user_id, &user_name).await;
    let summary = dependencies.summary();

    Ok(ApiResponse::success(DependencyReport { dependencies, summary }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReassignRequest {
    /// New owner; omitted or null unassigns
    #[serde(default)]
    pub to_user_id: Option<String>,
    /// Restrict to these modules; omitted means every module
    #[serde(default)]
    pub modules: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ReassignResponse {
    pub from_user_id: String,
    pub to_user_id: Option<String>,
    pub total: usize,
    pub reassigned: Vec<ReassignmentCount>,
    pub failures: Vec<ReassignmentFailure>,
}

/// POST /api/users/:id/reassign - move everything the user owns to another user
///
/// ```json
/// { "to_user_id": "b2c1...", "modules": ["companies", "projects"] }
/// ```
///
/// Dependencies are re-queried here; the client never supplies item lists.
pub async fn reassign(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(from_user_id): Path<String>,
    body: Result<Json<ReassignRequest>, JsonRejection>,
) -> ApiResult<ReassignResponse> {
    user.require_permission(&[EDIT_PERMISSION])?;

    let Json(request) = body.map_err(|e| ApiError::invalid_json(e.body_text()))?;

    let to_user_id = request
        .to_user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    if to_user_id.as_deref() == Some(from_user_id.as_str()) {
        return Err(ApiError::bad_request("Cannot reassign a user's items to the same user"));
    }

    if let Some(modules) = &request.modules {
        let unknown: Vec<&String> = modules.iter().filter(|m| !state.registry.contains(m)).collect();
        if !unknown.is_empty() {
            let field_errors: HashMap<String, String> = unknown
                .iter()
                .map(|m| (format!("modules.{}", m), "Unknown dependency module".to_string()))
                .collect();
            return Err(ApiError::validation_error("Unknown dependency module", Some(field_errors)));
        }
    }

    let dependencies = state.registry.query_dependencies(&from_user_id, &from_user_id).await;
    let categories: Vec<_> = dependencies
        .categories
        .into_iter()
        .filter(|c| match &request.modules {
            Some(modules) => modules.contains(&c.module),
            None => true,
        })
        .collect();

    let report = state
        .registry
        .reassign(&from_user_id, to_user_id.as_deref(), &categories)
        .await;

    tracing::info!(
        "User '{}' reassigned {} item(s) from '{}' to {:?}",
        user.identity.id,
        report.total(),
        from_user_id,
        to_user_id
    );

    Ok(ApiResponse::success(ReassignResponse {
        from_user_id,
        to_user_id,
        total: report.total(),
        reassigned: report.reassigned,
        failures: report.failures,
    }))
}
