//! User records and the directory the boundary resolves actors from.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rolegate_core::{DomainError, DomainResult, RoleId, UserId};

use crate::{Actor, AdminError, StoreError};

const MAX_PERSON_NAME_LEN: usize = 50;

/// A user account.
///
/// `role` is a nullable reference: removing the role leaves the user roleless,
/// which means no access to anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub is_active: bool,
    pub role: Option<RoleId>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, first_name: &str, role: Option<RoleId>) -> DomainResult<Self> {
        Ok(Self {
            id: UserId::new(),
            email: normalize_email(email)?,
            first_name: normalize_person_name(first_name, "first name")?,
            last_name: None,
            middle_name: None,
            is_active: true,
            role,
            date_joined: Utc::now(),
        })
    }

    /// The actor this user acts as. Inactive accounts authenticate as nobody.
    pub fn actor(&self) -> Actor {
        if self.is_active {
            Actor::authenticated(self.id, self.role)
        } else {
            Actor::anonymous()
        }
    }

    /// Apply a profile change.
    ///
    /// With `partial`, absent fields are left untouched (PATCH). Without it,
    /// `email` and `first_name` are required and absent optional names are
    /// cleared (PUT).
    pub fn apply_profile(&mut self, update: ProfileUpdate, partial: bool) -> DomainResult<()> {
        if !partial && (update.email.is_none() || update.first_name.is_none()) {
            return Err(DomainError::validation(
                "email and first_name are required for a full update",
            ));
        }

        let mut next = self.clone();
        if let Some(email) = update.email {
            next.email = normalize_email(&email)?;
        }
        if let Some(first_name) = update.first_name {
            next.first_name = normalize_person_name(&first_name, "first name")?;
        }
        match update.last_name {
            Some(name) => next.last_name = optional_person_name(&name, "last name")?,
            None if !partial => next.last_name = None,
            None => {}
        }
        match update.middle_name {
            Some(name) => next.middle_name = optional_person_name(&name, "middle name")?,
            None if !partial => next.middle_name = None,
            None => {}
        }

        *self = next;
        Ok(())
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
}

/// Storage of user accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Add a new user. Fails with a conflict if the email is taken.
    async fn insert(&self, user: User) -> Result<User, AdminError>;

    /// Apply [`User::apply_profile`] to the stored record and persist only the
    /// profile fields. `is_active` and `role` are never written here, so a
    /// concurrent deactivation or role change survives.
    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
        partial: bool,
    ) -> Result<User, AdminError>;

    /// Set or clear a user's role.
    async fn assign_role(&self, id: UserId, role: Option<RoleId>) -> Result<User, AdminError>;

    /// Soft delete: the record stays, the account stops authenticating.
    async fn deactivate(&self, id: UserId) -> Result<User, AdminError>;

    /// Detach a deleted role from every user holding it. Returns how many changed.
    async fn clear_role(&self, role: RoleId) -> Result<u64, StoreError>;
}

fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email)
}

fn normalize_person_name(raw: &str, field: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    if name.chars().count() > MAX_PERSON_NAME_LEN {
        return Err(DomainError::validation(format!(
            "{field} exceeds {MAX_PERSON_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn optional_person_name(raw: &str, field: &str) -> DomainResult<Option<String>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    normalize_person_name(raw, field).map(Some)
}
