//! Signing-key lookup for identity-provider tokens.
//!
//! Keys are fetched from the provider's JWKS endpoint and cached per `kid`
//! with a bounded entry count and a bounded age. The lock is never held
//! across the remote fetch, so concurrent misses for the same `kid` may
//! both fetch; the later insert wins.
//!
//! A `kid` that was absent from the last fetched key set is rejected
//! without another fetch until `UNKNOWN_KID_REFETCH_INTERVAL` has passed.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::provider::ProviderError;

/// Minimum spacing between fetches triggered by a `kid` the provider did not publish
pub const UNKNOWN_KID_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

/// Source of the provider's current key set
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, ProviderError>;
}

/// Fetches the key set over HTTPS
pub struct HttpKeyFetcher {
    client: reqwest::Client,
    jwks_uri: url::Url,
}

impl HttpKeyFetcher {
    pub fn new(jwks_uri: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let jwks_uri = url::Url::parse(jwks_uri)
            .map_err(|e| ProviderError::UpstreamUnavailable(format!("invalid JWKS uri '{}': {}", jwks_uri, e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::UpstreamUnavailable(e.to_string()))?;

        Ok(Self { client, jwks_uri })
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch(&self) -> Result<JwkSet, ProviderError> {
        let response = self
            .client
            .get(self.jwks_uri.clone())
            .send()
            .await
            .map_err(|e| ProviderError::UpstreamUnavailable(format!("JWKS request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| ProviderError::UpstreamUnavailable(format!("JWKS endpoint error: {}", e)))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| ProviderError::UpstreamUnavailable(format!("malformed JWKS document: {}", e)))
    }
}

struct CachedKey {
    key: DecodingKey,
    fetched_at: Instant,
    last_used: Instant,
}

/// Kids published by the most recent successful fetch
struct FetchRecord {
    at: Instant,
    kids: HashSet<String>,
}

/// Bounded, time-limited cache of decoding keys keyed by `kid`
pub struct JwksCache {
    fetcher: Arc<dyn KeyFetcher>,
    entries: RwLock<HashMap<String, CachedKey>>,
    last_fetch: RwLock<Option<FetchRecord>>,
    max_entries: usize,
    max_age: Duration,
}

impl JwksCache {
    pub fn new(fetcher: Arc<dyn KeyFetcher>, max_entries: usize, max_age: Duration) -> Self {
        Self {
            fetcher,
            entries: RwLock::new(HashMap::new()),
            last_fetch: RwLock::new(None),
            max_entries: max_entries.max(1),
            max_age,
        }
    }

    /// Resolve the decoding key for `kid`, fetching the key set on a miss or
    /// when the cached entry is older than the freshness window
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, ProviderError> {
        {
            let mut entries = self.entries.write().await;
            if let Some(entry) = entries.get_mut(kid) {
                if entry.fetched_at.elapsed() < self.max_age {
                    entry.last_used = Instant::now();
                    return Ok(entry.key.clone());
                }
            }
        }

        if self.recently_missing(kid).await {
            tracing::debug!("Signing key '{}' absent from recent JWKS, not refetching", kid);
            return Err(ProviderError::KeyNotFound(kid.to_string()));
        }

        tracing::debug!("Signing key '{}' not cached or stale, fetching JWKS", kid);
        let jwks = self.fetcher.fetch().await?;
        self.record_fetch(&jwks).await;

        let jwk = jwks
            .find(kid)
            .ok_or_else(|| ProviderError::KeyNotFound(kid.to_string()))?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| ProviderError::InvalidKey(e.to_string()))?;

        let mut entries = self.entries.write().await;
        entries.remove(kid);
        while entries.len() >= self.max_entries {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(kid, _)| kid.clone())
            else {
                break;
            };
            tracing::debug!("Evicting signing key '{}' from JWKS cache", oldest);
            entries.remove(&oldest);
        }

        let now = Instant::now();
        entries.insert(
            kid.to_string(),
            CachedKey {
                key: key.clone(),
                fetched_at: now,
                last_used: now,
            },
        );

        Ok(key)
    }

    async fn recently_missing(&self, kid: &str) -> bool {
        match self.last_fetch.read().await.as_ref() {
            Some(record) => record.at.elapsed() < UNKNOWN_KID_REFETCH_INTERVAL && !record.kids.contains(kid),
            None => false,
        }
    }

    async fn record_fetch(&self, jwks: &JwkSet) {
        let kids = jwks.keys.iter().filter_map(|jwk| jwk.common.key_id.clone()).collect();
        *self.last_fetch.write().await = Some(FetchRecord {
            at: Instant::now(),
            kids,
        });
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn contains(&self, kid: &str) -> bool {
        self.entries.read().await.contains_key(kid)
    }
}
