//! Role and permission checks over an already-resolved identity.
//!
//! Permissions are `<resource>:<action>` strings; `<resource>:*` grants every
//! action on the resource. Holders of the `admin` role pass every permission
//! check. Role checks have no admin bypass.

use thiserror::Error;

use super::identity::SessionIdentity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Requires one of roles: {}", required.join(", "))]
    MissingRole { required: Vec<String> },

    #[error("Missing required permission (one of): {}", required.join(", "))]
    MissingPermission { required: Vec<String> },
}

impl AccessError {
    pub fn is_forbidden(&self) -> bool {
        !matches!(self, AccessError::Unauthenticated)
    }
}

/// Allow when the identity holds at least one of `roles`
pub fn require_role<S: AsRef<str>>(identity: Option<&SessionIdentity>, roles: &[S]) -> Result<(), AccessError> {
    let identity = identity.ok_or(AccessError::Unauthenticated)?;

    if roles.iter().any(|role| identity.has_role(role.as_ref())) {
        return Ok(());
    }

    Err(AccessError::MissingRole {
        required: roles.iter().map(|r| r.as_ref().to_string()).collect(),
    })
}

/// Allow admins unconditionally; otherwise allow when any of `permissions`
/// is held exactly or through its resource wildcard
pub fn require_permission<S: AsRef<str>>(
    identity: Option<&SessionIdentity>,
    permissions: &[S],
) -> Result<(), AccessError> {
    let identity = identity.ok_or(AccessError::Unauthenticated)?;

    if identity.is_admin() {
        return Ok(());
    }

    if permissions.iter().any(|required| grants(identity, required.as_ref())) {
        return Ok(());
    }

    Err(AccessError::MissingPermission {
        required: permissions.iter().map(|p| p.as_ref().to_string()).collect(),
    })
}

fn grants(identity: &SessionIdentity, required: &str) -> bool {
    if identity.has_permission(required) {
        return true;
    }

    match wildcard_for(required) {
        Some(wildcard) => identity.has_permission(&wildcard),
        None => false,
    }
}

/// `"accounting:view"` -> `"accounting:*"`; split on the first colon only.
/// Permissions without a colon have no wildcard form.
pub fn wildcard_for(permission: &str) -> Option<String> {
    permission
        .split_once(':')
        .map(|(resource, _)| format!("{}:*", resource))
}
