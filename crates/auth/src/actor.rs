use serde::{Deserialize, Serialize};

use rolegate_core::{RoleId, UserId};

/// Snapshot of the identity making a request.
///
/// Built by the boundary from a verified token and the user directory; the
/// engine only reads it. An unauthenticated actor carries neither id nor role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    authenticated: bool,
    user_id: Option<UserId>,
    role: Option<RoleId>,
}

impl Actor {
    /// A request with no (or an unusable) credential.
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user_id: None,
            role: None,
        }
    }

    /// An authenticated user, optionally holding a role.
    pub fn authenticated(user_id: UserId, role: Option<RoleId>) -> Self {
        Self {
            authenticated: true,
            user_id: Some(user_id),
            role,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn role(&self) -> Option<RoleId> {
        self.role
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::anonymous()
    }
}
