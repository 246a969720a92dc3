use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use rolegate_auth::{AdminError, ProfileUpdate, StoreError, User, UserDirectory};
use rolegate_core::{DomainError, RoleId, UserId};

/// In-memory user directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<UserId, User>>, StoreError> {
        self.users
            .read()
            .map_err(|_| StoreError::Unavailable("user directory lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<UserId, User>>, StoreError> {
        self.users
            .write()
            .map_err(|_| StoreError::Unavailable("user directory lock poisoned".to_string()))
    }
}

fn email_taken(users: &HashMap<UserId, User>, email: &str, except: UserId) -> bool {
    users.values().any(|u| u.id != except && u.email == email)
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.read()?.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn insert(&self, user: User) -> Result<User, AdminError> {
        let mut users = self.write()?;
        if users.contains_key(&user.id) || email_taken(&users, &user.email, user.id) {
            return Err(DomainError::conflict(format!("user '{}' already exists", user.email)).into());
        }
        users.insert(user.id, user.clone());
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
        partial: bool,
    ) -> Result<User, AdminError> {
        let mut users = self.write()?;
        let mut next = users
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("user"))?;
        next.apply_profile(update, partial)?;
        if email_taken(&users, &next.email, id) {
            return Err(DomainError::conflict(format!("email '{}' is already in use", next.email)).into());
        }
        users.insert(id, next.clone());
        Ok(next)
    }

    async fn assign_role(&self, id: UserId, role: Option<RoleId>) -> Result<User, AdminError> {
        let mut users = self.write()?;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("user"))?;
        user.role = role;
        tracing::info!(user_id = %id, role_id = ?role, "user role assigned");
        Ok(user.clone())
    }

    async fn deactivate(&self, id: UserId) -> Result<User, AdminError> {
        let mut users = self.write()?;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("user"))?;
        user.is_active = false;
        tracing::info!(user_id = %id, "user deactivated");
        Ok(user.clone())
    }

    async fn clear_role(&self, role: RoleId) -> Result<u64, StoreError> {
        let mut users = self.write()?;
        let mut changed = 0;
        for user in users.values_mut().filter(|u| u.role == Some(role)) {
            user.role = None;
            changed += 1;
        }
        Ok(changed)
    }
}
