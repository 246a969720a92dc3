//! Rule Store contract.
//!
//! The engine only needs [`RuleStore`] (read side). Administrative mutation is
//! the separate [`RuleAdmin`] capability; backends usually implement both.

use async_trait::async_trait;
use thiserror::Error;

use rolegate_core::{DomainError, ElementId, RoleId, RuleId};

use crate::{AccessRoleRule, BusinessElement, PermissionFlags, Role};

/// Failure of the backing store itself.
///
/// "Nothing matched" is never a `StoreError`; lookups return `Ok(None)`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupted record: {0}")]
    Corrupted(String),
}

/// Failure of an administrative (mutating) operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read side of the role × element → permission matrix.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Resolve a business element by its unique name.
    async fn find_element(&self, name: &str) -> Result<Option<BusinessElement>, StoreError>;

    /// Fetch the rule for a `(role, element)` pair.
    async fn find_rule(
        &self,
        role: RoleId,
        element: ElementId,
    ) -> Result<Option<AccessRoleRule>, StoreError>;

    /// Fetch the rule for a role and an element *name*.
    ///
    /// `Ok(None)` when the element is unknown or no rule exists for the pair;
    /// the two causes are not distinguished. Backends that can do
    /// this in one round trip should override it.
    async fn lookup_rule(
        &self,
        role: RoleId,
        element_name: &str,
    ) -> Result<Option<AccessRoleRule>, StoreError> {
        match self.find_element(element_name).await? {
            Some(element) => self.find_rule(role, element.id).await,
            None => Ok(None),
        }
    }
}

/// Administrative mutation of roles, elements and rules.
///
/// Implementations enforce name uniqueness and at most one rule per
/// `(role, element)` pair. Deleting a role or element removes its rules.
#[async_trait]
pub trait RuleAdmin: Send + Sync {
    async fn create_role(&self, name: &str) -> Result<Role, AdminError>;
    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, AdminError>;
    async fn list_roles(&self) -> Result<Vec<Role>, AdminError>;
    async fn delete_role(&self, id: RoleId) -> Result<(), AdminError>;

    async fn create_element(&self, name: &str) -> Result<BusinessElement, AdminError>;
    async fn list_elements(&self) -> Result<Vec<BusinessElement>, AdminError>;
    async fn delete_element(&self, id: ElementId) -> Result<(), AdminError>;

    /// Insert the rule for `(role, element)`. Fails with a conflict if one exists.
    async fn grant(
        &self,
        role: RoleId,
        element: ElementId,
        flags: PermissionFlags,
    ) -> Result<AccessRoleRule, AdminError>;

    /// Replace the flag set of an existing rule.
    async fn update_rule(
        &self,
        id: RuleId,
        flags: PermissionFlags,
    ) -> Result<AccessRoleRule, AdminError>;

    async fn revoke(&self, id: RuleId) -> Result<(), AdminError>;
    async fn list_rules(&self) -> Result<Vec<AccessRoleRule>, AdminError>;
}
