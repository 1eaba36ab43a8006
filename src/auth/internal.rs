use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use super::identity::SessionIdentity;
use crate::config::AuthConfig;

#[derive(Debug, Error)]
pub enum InternalTokenError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid internal token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Issues and verifies tokens signed with the shared secret (HS256)
pub struct InternalTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: u64,
    configured: bool,
}

impl InternalTokenService {
    pub fn new(secret: &str, expiry_hours: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
            configured: !secret.is_empty(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_expiry_hours)
    }

    pub fn expiry_hours(&self) -> u64 {
        self.expiry_hours
    }

    /// Sign a token for `identity`, stamping fresh `iat`/`exp` values.
    /// Returns the token and the identity exactly as embedded.
    pub fn issue(&self, identity: &SessionIdentity) -> Result<(String, SessionIdentity), InternalTokenError> {
        if !self.configured {
            return Err(InternalTokenError::InvalidSecret);
        }

        let now = Utc::now();
        let exp = (now + Duration::hours(self.expiry_hours as i64)).timestamp();
        let claims = SessionIdentity {
            iat: Some(now.timestamp()),
            exp: Some(exp),
            ..identity.clone()
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| InternalTokenError::TokenGeneration(e.to_string()))?;

        Ok((token, claims))
    }

    /// Verify signature and expiry; the payload is returned as the identity
    pub fn verify(&self, token: &str) -> Result<SessionIdentity, InternalTokenError> {
        if !self.configured {
            return Err(InternalTokenError::InvalidSecret);
        }

        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<SessionIdentity>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}
