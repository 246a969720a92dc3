use serde::{Deserialize, Serialize};

use rolegate_core::{ElementId, RoleId, RuleId, UserId};

use crate::Verb;

/// The seven independent permission flags of one matrix cell.
///
/// "own" flags cover records the actor owns; "all" flags cover every record of
/// the element. The flags are not hierarchical: `update_all` does not imply
/// `update_own` and both may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionFlags {
    pub read_own: bool,
    pub read_all: bool,
    pub create: bool,
    pub update_own: bool,
    pub update_all: bool,
    pub delete_own: bool,
    pub delete_all: bool,
}

impl PermissionFlags {
    /// No access at all (same outcome as a missing rule).
    pub fn none() -> Self {
        Self::default()
    }

    /// Every flag set.
    pub fn full() -> Self {
        Self {
            read_own: true,
            read_all: true,
            create: true,
            update_own: true,
            update_all: true,
            delete_own: true,
            delete_all: true,
        }
    }

    /// Map a verb onto the flags that satisfy it.
    ///
    /// Returns `None` when no flag for the verb is set.
    pub fn grant_for(&self, verb: Verb) -> Option<Grant> {
        let (own, all) = match verb {
            Verb::Read => (self.read_own, self.read_all),
            // Creation is not partitioned by ownership.
            Verb::Create => (false, self.create),
            Verb::Update => (self.update_own, self.update_all),
            Verb::Delete => (self.delete_own, self.delete_all),
        };

        (own || all).then_some(Grant { verb, own, all })
    }
}

/// One cell of the role × element matrix.
///
/// At most one rule exists per `(role_id, element_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRoleRule {
    pub id: RuleId,
    pub role_id: RoleId,
    pub element_id: ElementId,
    #[serde(flatten)]
    pub flags: PermissionFlags,
}

impl AccessRoleRule {
    pub fn new(role_id: RoleId, element_id: ElementId, flags: PermissionFlags) -> Self {
        Self {
            id: RuleId::new(),
            role_id,
            element_id,
            flags,
        }
    }
}

/// Breadth of an allowed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Only records owned by the actor.
    Own,
    /// Every record of the element.
    All,
}

/// The flags that made an action allowed.
///
/// A create grant reports `all = true`: the `create` flag has no own-scope
/// counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    pub verb: Verb,
    pub own: bool,
    pub all: bool,
}

impl Grant {
    /// Widest scope the grant covers.
    pub fn scope(&self) -> Scope {
        if self.all { Scope::All } else { Scope::Own }
    }

    pub fn is_own_only(&self) -> bool {
        self.scope() == Scope::Own
    }

    /// Whether the grant reaches a record owned by `owner`.
    pub fn covers(&self, actor: Option<UserId>, owner: UserId) -> bool {
        self.all || (self.own && actor == Some(owner))
    }
}
