//! Azure AD access-token verification.
//!
//! Only RS256 is accepted. The token's `kid` selects the signing key from the
//! tenant JWKS (through [`JwksCache`]); audience must be the configured client
//! id and the issuer must be one of the tenant's two issuer forms.

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use super::identity::{SessionIdentity, DEFAULT_ROLE};
use super::jwks::{HttpKeyFetcher, JwksCache, KeyFetcher};
use crate::config::{AuthConfig, SecurityConfig};

const ALLOWED_ALGORITHMS: [Algorithm; 1] = [Algorithm::RS256];

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("identity provider not configured")]
    NotConfigured,

    #[error("unsupported algorithm {0:?}")]
    UnsupportedAlgorithm(Algorithm),

    #[error("missing key id")]
    MissingKeyId,

    #[error("signing key '{0}' not found in JWKS")]
    KeyNotFound(String),

    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("signing keys unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("missing subject claim")]
    MissingSubject,

    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl ProviderError {
    pub fn is_upstream(&self) -> bool {
        matches!(self, ProviderError::UpstreamUnavailable(_))
    }
}

/// Claims read from an Azure AD access token
#[derive(Debug, Deserialize)]
struct ProviderClaims {
    oid: Option<String>,
    sub: Option<String>,
    preferred_username: Option<String>,
    email: Option<String>,
    upn: Option<String>,
    name: Option<String>,
    roles: Option<Vec<String>>,
    iat: Option<i64>,
    exp: Option<i64>,
}

impl ProviderClaims {
    /// Permissions are never taken from provider tokens; they are resolved
    /// from the permission store by the caller.
    fn into_identity(self) -> Result<SessionIdentity, ProviderError> {
        let id = self.oid.or(self.sub).ok_or(ProviderError::MissingSubject)?;
        let email = self
            .preferred_username
            .or(self.email)
            .or(self.upn)
            .unwrap_or_default();
        let name = self.name.unwrap_or_else(|| email.clone());
        let roles = self.roles.unwrap_or_else(|| vec![DEFAULT_ROLE.to_string()]);

        Ok(SessionIdentity {
            id,
            email,
            name,
            roles,
            permissions: Vec::new(),
            iat: self.iat,
            exp: self.exp,
        })
    }
}

pub struct ProviderVerifier {
    keys: JwksCache,
    audience: String,
    issuers: Vec<String>,
    configured: bool,
}

impl ProviderVerifier {
    pub fn new(fetcher: Arc<dyn KeyFetcher>, config: &AuthConfig) -> Self {
        Self {
            keys: JwksCache::new(fetcher, config.jwks_cache_max_entries, config.jwks_cache_max_age()),
            audience: config.azure_client_id.clone(),
            issuers: config.accepted_issuers().to_vec(),
            configured: !config.azure_tenant_id.is_empty() && !config.azure_client_id.is_empty(),
        }
    }

    /// Verifier fetching keys from the tenant's JWKS endpoint over HTTPS
    pub fn from_config(config: &AuthConfig, security: &SecurityConfig) -> Result<Self, ProviderError> {
        let timeout = std::time::Duration::from_secs(security.upstream_timeout_secs);
        let fetcher = HttpKeyFetcher::new(&config.jwks_uri(), timeout)?;
        Ok(Self::new(Arc::new(fetcher), config))
    }

    pub async fn verify(&self, token: &str) -> Result<SessionIdentity, ProviderError> {
        if !self.configured {
            return Err(ProviderError::NotConfigured);
        }

        let header = decode_header(token)?;
        if !ALLOWED_ALGORITHMS.contains(&header.alg) {
            return Err(ProviderError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header.kid.as_deref().ok_or(ProviderError::MissingKeyId)?;

        let key = self.keys.get_key(kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(self.issuers.as_slice());
        validation
            .required_spec_claims
            .extend(["iss".to_string(), "aud".to_string()]);

        let token_data = decode::<ProviderClaims>(token, &key, &validation)?;
        token_data.claims.into_identity()
    }
}
