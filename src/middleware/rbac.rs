use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::middleware::auth::Identity;

/// Roles a token can carry. Anything else is rejected at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Exact match only: `Admin` or ` admin` are not valid roles.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Roles allowed to read objects.
pub const READERS: &[Role] = &[Role::Admin, Role::Member];
/// Roles allowed to create, update or delete objects.
pub const WRITERS: &[Role] = &[Role::Admin];

/// Per-handler authorization. The auth gate only proves the token is valid;
/// each operation decides which roles may run it.
pub fn enforce(identity: &Identity, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&identity.role) {
        return Ok(());
    }
    tracing::warn!(
        role = %identity.role,
        allowed = ?allowed,
        "RBAC access denied"
    );
    Err(AppError::Forbidden)
}

// ── Tests ───────────────────────────────────────────────────────
