//! Shared fixtures for unit tests: an RSA signing key standing in for the
//! identity provider, a key fetcher that counts calls, and token helpers.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::auth::jwks::KeyFetcher;
use crate::auth::provider::ProviderError;
use crate::config::{AppConfig, AuthConfig};

pub const TEST_TENANT: &str = "contoso-tenant";
pub const TEST_CLIENT_ID: &str = "client-123";
pub const TEST_SECRET: &str = "test-secret";

pub const TEST_PRIVATE_KEY_PEM: &str = include_str!("../../tests/fixtures/provider_key.pem");

pub const TEST_JWK_N: &str = "yRE6rHuNR0QbHO3H3Kt2pOKGVhQqGZXInOduQNxXzuKlvQTLUTv4l4sggh5_CYYi_cvI-SXVT9kPWSKXxJXBXd_4LkvcPuUakBoAkfh-eiFVMh2VrUyWyj3MFl0HTVF9KwRXLAcwkREiS3npThHRyIxuy0ZMeZfxVL5arMhw1SRELB8HoGfG_AtH89BIE9jDBHZ9dLelK9a184zAf8LwoPLxvJb3Il5nncqPcSfKDDodMFBIMc4lQzDKL5gvmiXLXB1AGLm8KBjfE8s3L5xqi-yUod-j8MtvIj812dkS4QMiRVN_by2h3ZY8LYVGrqZXZTcgn2ujn8uKjXLZVD5TdQ";
pub const TEST_JWK_E: &str = "AQAB";

/// Auth settings matching the fixtures in this module
pub fn test_auth_config() -> AuthConfig {
    let mut auth = AppConfig::development().auth;
    auth.azure_tenant_id = TEST_TENANT.to_string();
    auth.azure_client_id = TEST_CLIENT_ID.to_string();
    auth.jwt_secret = TEST_SECRET.to_string();
    auth
}

/// JWKS publishing the test public key under each of `kids`
pub fn jwk_set(kids: &[&str]) -> JwkSet {
    let keys: Vec<Value> = kids
        .iter()
        .map(|kid| {
            json!({
                "kty": "RSA",
                "kid": kid,
                "alg": "RS256",
                "use": "sig",
                "n": TEST_JWK_N,
                "e": TEST_JWK_E
            })
        })
        .collect();

    serde_json::from_value(json!({ "keys": keys })).expect("test jwks")
}

/// RS256 token signed with the test key
pub fn mint_provider_token(kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY_PEM.as_bytes()).expect("test key");
    jsonwebtoken::encode(&header, claims, &key).expect("provider token")
}

/// Key fetcher returning a fixed key set (or always failing) and counting calls
pub struct StaticKeyFetcher {
    jwks: Option<JwkSet>,
    calls: AtomicUsize,
}

impl StaticKeyFetcher {
    pub fn new(jwks: JwkSet) -> Self {
        Self {
            jwks: Some(jwks),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            jwks: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyFetcher for StaticKeyFetcher {
    async fn fetch(&self) -> Result<JwkSet, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.jwks
            .clone()
            .ok_or_else(|| ProviderError::UpstreamUnavailable("connection refused".to_string()))
    }
}
