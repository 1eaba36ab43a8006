use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{InternalTokenService, PermissionStore, TokenVerifier};
use crate::config::{AppConfig, InternalPermissionPolicy, SecurityConfig};
use crate::database::DatabaseManager;
use crate::handlers::{elevated, protected, public};
use crate::registry::DependencyRegistry;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<TokenVerifier>,
    pub tokens: Arc<InternalTokenService>,
    pub permissions: Arc<dyn PermissionStore>,
    pub registry: Arc<DependencyRegistry>,
    pub database: Option<DatabaseManager>,
    pub internal_permissions: InternalPermissionPolicy,
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let protected_routes = Router::new()
        .route("/api/auth/whoami", get(protected::session::whoami))
        .route("/api/auth/token", post(protected::session::issue_token))
        .route("/api/users/:id/dependencies", get(protected::users::dependencies))
        .route("/api/users/:id/reassign", post(protected::users::reassign))
        .route("/api/admin/dependency-modules", get(elevated::modules::list))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::authenticate,
        ));

    let mut router = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(protected_routes)
        .layer(cors_layer(&config.security));

    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
