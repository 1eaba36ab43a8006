use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::identity::{IdentitySource, SessionIdentity};
use super::internal::InternalTokenService;
use super::provider::ProviderVerifier;

/// Outcome of running a bearer token through both verification paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Verified against the identity provider's signing keys
    Provider(SessionIdentity),
    /// Verified with the shared secret
    Internal(SessionIdentity),
    /// Neither path accepted the token
    Unverified,
}

impl Verification {
    pub fn source(&self) -> Option<IdentitySource> {
        match self {
            Verification::Provider(_) => Some(IdentitySource::Provider),
            Verification::Internal(_) => Some(IdentitySource::Internal),
            Verification::Unverified => None,
        }
    }

    pub fn into_identity(self) -> Option<(SessionIdentity, IdentitySource)> {
        match self {
            Verification::Provider(identity) => Some((identity, IdentitySource::Provider)),
            Verification::Internal(identity) => Some((identity, IdentitySource::Internal)),
            Verification::Unverified => None,
        }
    }
}

/// Tries the provider path first and the internal path only when it fails
pub struct TokenVerifier {
    provider: ProviderVerifier,
    internal: Arc<InternalTokenService>,
}

impl TokenVerifier {
    pub fn new(provider: ProviderVerifier, internal: Arc<InternalTokenService>) -> Self {
        Self { provider, internal }
    }

    pub async fn verify(&self, token: &str) -> Verification {
        let fingerprint = token_fingerprint(token);

        match self.provider.verify(token).await {
            Ok(identity) => {
                tracing::debug!("Token {} verified by identity provider for '{}'", fingerprint, identity.id);
                return Verification::Provider(identity);
            }
            Err(e) if e.is_upstream() => {
                tracing::warn!("Identity provider keys unavailable for token {}: {}", fingerprint, e);
            }
            Err(e) => {
                tracing::debug!("Provider verification failed for token {}: {}", fingerprint, e);
            }
        }

        match self.internal.verify(token) {
            Ok(identity) => {
                tracing::debug!("Token {} verified as internal token for '{}'", fingerprint, identity.id);
                Verification::Internal(identity)
            }
            Err(e) => {
                tracing::debug!("Internal verification failed for token {}: {}", fingerprint, e);
                Verification::Unverified
            }
        }
    }
}

/// Short digest identifying a token in logs without exposing it
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().take(6).map(|b| format!("{:02x}", b)).collect()
}
