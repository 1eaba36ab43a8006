#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use bizdesk_api::auth::{
    InternalTokenService, KeyFetcher, MemoryPermissionStore, ProviderError, ProviderVerifier, SessionIdentity,
    TokenVerifier,
};
use bizdesk_api::config::{AppConfig, InternalPermissionPolicy};
use bizdesk_api::registry::{DependencyRegistry, DependencySource, ModuleDescriptor, SourceError};
use bizdesk_api::server::{self, AppState};

pub const TENANT: &str = "contoso-tenant";
pub const CLIENT_ID: &str = "client-123";
pub const SECRET: &str = "integration-secret";
pub const KID: &str = "kid-1";

const PRIVATE_KEY_PEM: &str = include_str!("../fixtures/provider_key.pem");
const JWK_N: &str = "yRE6rHuNR0QbHO3H3Kt2pOKGVhQqGZXInOduQNxXzuKlvQTLUTv4l4sggh5_CYYi_cvI-SXVT9kPWSKXxJXBXd_4LkvcPuUakBoAkfh-eiFVMh2VrUyWyj3MFl0HTVF9KwRXLAcwkREiS3npThHRyIxuy0ZMeZfxVL5arMhw1SRELB8HoGfG_AtH89BIE9jDBHZ9dLelK9a184zAf8LwoPLxvJb3Il5nncqPcSfKDDodMFBIMc4lQzDKL5gvmiXLXB1AGLm8KBjfE8s3L5xqi-yUod-j8MtvIj812dkS4QMiRVN_by2h3ZY8LYVGrqZXZTcgn2ujn8uKjXLZVD5TdQ";

/// Serves the test public key as if it were the tenant's JWKS endpoint
struct FixtureKeys;

#[async_trait]
impl KeyFetcher for FixtureKeys {
    async fn fetch(&self) -> Result<JwkSet, ProviderError> {
        serde_json::from_value(json!({
            "keys": [{ "kty": "RSA", "kid": KID, "alg": "RS256", "use": "sig", "n": JWK_N, "e": "AQAB" }]
        }))
        .map_err(|e| ProviderError::UpstreamUnavailable(e.to_string()))
    }
}

/// A business record held in memory
#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub owner: Option<String>,
}

pub type Table = Arc<Mutex<Vec<Record>>>;

pub fn table(rows: &[(&str, &str, Option<&str>)]) -> Table {
    Arc::new(Mutex::new(
        rows.iter()
            .map(|(id, name, owner)| Record {
                id: id.to_string(),
                name: name.to_string(),
                owner: owner.map(str::to_string),
            })
            .collect(),
    ))
}

pub fn owners(table: &Table) -> Vec<Option<String>> {
    table.lock().unwrap().iter().map(|r| r.owner.clone()).collect()
}

/// Dependency source over an in-memory table; `reject` ids fail on reassignment
pub struct TableSource {
    pub rows: Table,
    pub reject: Vec<String>,
}

#[async_trait]
impl DependencySource for TableSource {
    type Item = Record;

    async fn items(&self) -> Result<Vec<Record>, SourceError> {
        Ok(self.rows.lock().unwrap().clone())
    }

    fn owner_id<'a>(&self, item: &'a Record) -> Option<&'a str> {
        item.owner.as_deref()
    }

    fn item_id(&self, item: &Record) -> String {
        item.id.clone()
    }

    fn item_name(&self, item: &Record) -> String {
        item.name.clone()
    }

    async fn reassign(&self, item_id: &str, to_user_id: Option<&str>) -> Result<(), SourceError> {
        if self.reject.iter().any(|id| id == item_id) {
            return Err(SourceError::Failed("row is locked".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == item_id)
            .ok_or_else(|| SourceError::NotFound(item_id.to_string()))?;
        row.owner = to_user_id.map(str::to_string);
        Ok(())
    }
}

/// Router running in-process on a free port
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub permissions: Arc<MemoryPermissionStore>,
    pub registry: Arc<DependencyRegistry>,
    pub tokens: Arc<InternalTokenService>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with_policy(InternalPermissionPolicy::Token).await
    }

    pub async fn start_with_policy(policy: InternalPermissionPolicy) -> Result<Self> {
        let mut config = AppConfig::development();
        config.auth.azure_tenant_id = TENANT.to_string();
        config.auth.azure_client_id = CLIENT_ID.to_string();
        config.auth.jwt_secret = SECRET.to_string();
        config.auth.internal_permissions = policy;
        config.api.enable_request_logging = false;

        let tokens = Arc::new(InternalTokenService::from_config(&config.auth));
        let provider = ProviderVerifier::new(Arc::new(FixtureKeys), &config.auth);
        let permissions = Arc::new(MemoryPermissionStore::new());
        let registry = Arc::new(DependencyRegistry::new());

        let state = AppState {
            verifier: Arc::new(TokenVerifier::new(provider, tokens.clone())),
            tokens: tokens.clone(),
            permissions: permissions.clone(),
            registry: registry.clone(),
            database: None,
            internal_permissions: policy,
        };

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        let app = server::app(state, &config);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            permissions,
            registry,
            tokens,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Internal token for an identity with the given roles and permissions
    pub fn internal_token(&self, id: &str, roles: &[&str], permissions: &[&str]) -> String {
        let identity = SessionIdentity {
            id: id.to_string(),
            email: format!("{}@contoso.com", id),
            name: id.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            iat: None,
            exp: None,
        };
        self.tokens.issue(&identity).expect("issue internal token").0
    }

    pub fn register(&self, descriptor: ModuleDescriptor, rows: Table, reject: &[&str]) {
        self.registry.register(
            descriptor,
            TableSource {
                rows,
                reject: reject.iter().map(|id| id.to_string()).collect(),
            },
        );
    }
}

/// RS256 token signed with the fixture key, as the identity provider would issue
pub fn provider_token(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM.as_bytes()).expect("fixture key");
    jsonwebtoken::encode(&header, claims, &key).expect("provider token")
}

/// Standard provider claims for `oid`, merged with `extra`
pub fn provider_claims(oid: &str, extra: Value) -> Value {
    let now = chrono::Utc::now().timestamp();
    let mut claims = json!({
        "iss": format!("https://login.microsoftonline.com/{}/v2.0", TENANT),
        "aud": CLIENT_ID,
        "oid": oid,
        "preferred_username": format!("{}@contoso.com", oid),
        "name": "Provider User",
        "iat": now,
        "exp": now + 600
    });
    if let (Some(base), Some(extra)) = (claims.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    claims
}
