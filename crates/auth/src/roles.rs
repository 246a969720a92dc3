use serde::{Deserialize, Serialize};

use rolegate_core::{DomainError, DomainResult, RoleId};

/// Longest role name the store accepts.
pub const MAX_ROLE_NAME_LEN: usize = 50;

/// A named role. Users reference at most one; rules reference exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

impl Role {
    /// Build a role with a fresh id after validating the name.
    pub fn new(name: &str) -> DomainResult<Self> {
        Ok(Self {
            id: RoleId::new(),
            name: normalize_name(name, MAX_ROLE_NAME_LEN, "role")?,
        })
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Trim and bound-check an administrative name.
pub(crate) fn normalize_name(raw: &str, max_len: usize, kind: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation(format!("{kind} name cannot be empty")));
    }
    if name.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "{kind} name exceeds {max_len} characters"
        )));
    }
    Ok(name.to_string())
}
