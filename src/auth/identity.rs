use serde::{Deserialize, Serialize};

use crate::config::InternalPermissionPolicy;

/// Role that satisfies every permission check
pub const ADMIN_ROLE: &str = "admin";

/// Role assigned to provider identities whose token carries no roles claim
pub const DEFAULT_ROLE: &str = "viewer";

/// Normalized identity resolved from a bearer token.
///
/// For internally issued tokens this is also the token payload, so the
/// serialized field names are part of the token format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Which verification path produced the identity for this request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// External identity provider (Azure AD) token
    Provider,
    /// Token signed by this service with the shared secret
    Internal,
}

impl IdentitySource {
    /// Provider tokens carry no permissions, so they always come from the
    /// store; internal tokens do only under the `storage` policy
    pub fn permissions_from_store(self, policy: InternalPermissionPolicy) -> bool {
        match self {
            IdentitySource::Provider => true,
            IdentitySource::Internal => policy == InternalPermissionPolicy::Storage,
        }
    }
}

impl SessionIdentity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}
