use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// How permissions embedded in internally issued tokens are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalPermissionPolicy {
    /// Embedded permissions are the identity's permissions
    Token,
    /// Permissions are reloaded from the permission store on every request
    Storage,
}

impl InternalPermissionPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "token" => Some(Self::Token),
            "storage" | "db" | "database" => Some(Self::Storage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub azure_tenant_id: String,
    pub azure_client_id: String,
    /// Overrides the tenant-derived JWKS endpoint (sovereign clouds, local testing)
    pub jwks_uri: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub jwks_cache_max_entries: usize,
    pub jwks_cache_max_age_secs: u64,
    pub internal_permissions: InternalPermissionPolicy,
}

impl AuthConfig {
    pub fn jwks_uri(&self) -> String {
        match &self.jwks_uri {
            Some(uri) => uri.clone(),
            None => format!(
                "https://login.microsoftonline.com/{}/discovery/v2.0/keys",
                self.azure_tenant_id
            ),
        }
    }

    /// Both issuer forms Azure AD puts in access tokens (v2 and v1 endpoints)
    pub fn accepted_issuers(&self) -> [String; 2] {
        [
            format!("https://login.microsoftonline.com/{}/v2.0", self.azure_tenant_id),
            format!("https://sts.windows.net/{}/", self.azure_tenant_id),
        ]
    }

    pub fn jwks_cache_max_age(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_max_age_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub upstream_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Auth overrides
        if let Ok(v) = env::var("AZURE_TENANT_ID") {
            self.auth.azure_tenant_id = v;
        }
        if let Ok(v) = env::var("AZURE_CLIENT_ID") {
            self.auth.azure_client_id = v;
        }
        if let Ok(v) = env::var("AZURE_JWKS_URI") {
            self.auth.jwks_uri = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.auth.jwt_expiry_hours = v.parse().unwrap_or(self.auth.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("JWKS_CACHE_MAX_ENTRIES") {
            self.auth.jwks_cache_max_entries = v.parse().unwrap_or(self.auth.jwks_cache_max_entries);
        }
        if let Ok(v) = env::var("JWKS_CACHE_MAX_AGE_SECS") {
            self.auth.jwks_cache_max_age_secs = v.parse().unwrap_or(self.auth.jwks_cache_max_age_secs);
        }
        if let Ok(v) = env::var("INTERNAL_PERMISSIONS") {
            self.auth.internal_permissions =
                InternalPermissionPolicy::parse(&v).unwrap_or(self.auth.internal_permissions);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(port) = env::var("BIZDESK_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_UPSTREAM_TIMEOUT_SECS") {
            self.security.upstream_timeout_secs = v.parse().unwrap_or(self.security.upstream_timeout_secs);
        }

        self
    }

    fn auth_defaults(internal_permissions: InternalPermissionPolicy, jwt_expiry_hours: u64) -> AuthConfig {
        AuthConfig {
            azure_tenant_id: String::new(),
            azure_client_id: String::new(),
            jwks_uri: None,
            jwt_secret: String::new(),
            jwt_expiry_hours,
            jwks_cache_max_entries: 5,
            jwks_cache_max_age_secs: 10 * 60,
            internal_permissions,
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            auth: Self::auth_defaults(InternalPermissionPolicy::Token, 24),
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                upstream_timeout_secs: 10,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            auth: Self::auth_defaults(InternalPermissionPolicy::Storage, 24),
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
                upstream_timeout_secs: 5,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            auth: Self::auth_defaults(InternalPermissionPolicy::Storage, 8),
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
                upstream_timeout_secs: 5,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
