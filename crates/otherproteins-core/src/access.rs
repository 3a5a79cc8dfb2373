//! # Access Control
//!
//! Roles and the explicit acting-user context.
//!
//! ## How Authorization Flows
//! ```text
//! Bearer token ──► HTTP layer decodes ──► Actor { user_id, role }
//!                                              │
//!                     ┌────────────────────────┼────────────────────────┐
//!                     ▼                        ▼                        ▼
//!              cart operations         order operations         admin operations
//!              (scoped to user_id)     (owner or admin)         require_admin(&actor)?
//! ```
//!
//! Nothing reads a "current user" from ambient state: every cart and order
//! call takes the [`Actor`] as an argument.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Role
// =============================================================================

/// Account role, stored on the user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }
}

// =============================================================================
// Actor
// =============================================================================

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub const fn customer(user_id: i64) -> Self {
        Actor {
            user_id,
            role: Role::Customer,
        }
    }

    pub const fn admin(user_id: i64) -> Self {
        Actor {
            user_id,
            role: Role::Admin,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this actor may see or act on a record owned by `owner_id`.
    #[inline]
    pub fn can_access(&self, owner_id: i64) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

/// Fails with `Forbidden` unless the actor is an admin.
///
/// `action` names the gated operation in the rejection and in logs.
pub fn require_admin(actor: &Actor, action: &'static str) -> CoreResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(CoreError::Forbidden { action })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&Actor::admin(1), "adjust_stock").is_ok());

        let err = require_admin(&Actor::customer(2), "adjust_stock").unwrap_err();
        assert_eq!(err, CoreError::Forbidden { action: "adjust_stock" });
    }

    #[test]
    fn test_ownership() {
        let ane = Actor::customer(2);
        assert!(ane.can_access(2));
        assert!(!ane.can_access(3));
        assert!(Actor::admin(1).can_access(3));
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"customer\"");
    }
}
