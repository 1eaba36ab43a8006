pub mod gate;
pub mod identity;
pub mod internal;
pub mod jwks;
pub mod permissions;
pub mod provider;
pub mod verifier;

pub use gate::{require_permission, require_role, AccessError};
pub use identity::{IdentitySource, SessionIdentity, ADMIN_ROLE, DEFAULT_ROLE};
pub use internal::{InternalTokenError, InternalTokenService};
pub use jwks::{HttpKeyFetcher, JwksCache, KeyFetcher};
pub use permissions::{MemoryPermissionStore, PermissionStore, PermissionStoreError, PgPermissionStore};
pub use provider::{ProviderError, ProviderVerifier};
pub use verifier::{token_fingerprint, TokenVerifier, Verification};
