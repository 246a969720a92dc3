//! Store wiring shared by every handler.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use rolegate_auth::{AccessEngine, AdminError, RuleAdmin, RuleStore, User, UserDirectory};
use rolegate_core::RoleId;
use rolegate_infra::{
    InMemoryRuleStore, InMemoryUserDirectory, PostgresRuleStore, PostgresUserDirectory,
    SeededRoles, seed_defaults,
};

#[derive(Clone)]
pub struct AppServices {
    pub engine: AccessEngine,
    pub admin: Arc<dyn RuleAdmin>,
    pub users: Arc<dyn UserDirectory>,
}

/// What [`AppServices::in_memory_seeded`] created.
#[derive(Debug, Clone)]
pub struct DemoAccounts {
    pub roles: SeededRoles,
    pub admin: User,
    pub user: User,
}

impl AppServices {
    fn from_parts(
        rules: Arc<dyn RuleStore>,
        admin: Arc<dyn RuleAdmin>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            engine: AccessEngine::new(rules),
            admin,
            users,
        }
    }

    /// Empty in-memory stores.
    pub fn in_memory() -> Self {
        let rules = Arc::new(InMemoryRuleStore::new());
        Self::from_parts(rules.clone(), rules, Arc::new(InMemoryUserDirectory::new()))
    }

    /// In-memory stores holding the default matrix and one active account per role.
    pub async fn in_memory_seeded() -> Result<(Self, DemoAccounts), AdminError> {
        let services = Self::in_memory();
        let roles = seed_defaults(services.admin.as_ref()).await?;

        let admin = services
            .users
            .insert(User::new("admin@example.com", "Admin", Some(roles.admin.id))?)
            .await?;
        let user = services
            .users
            .insert(User::new("user@example.com", "User", Some(roles.user.id))?)
            .await?;

        Ok((services, DemoAccounts { roles, admin, user }))
    }

    /// Postgres-backed stores. The schema must already exist.
    pub async fn postgres(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("failed to connect to Postgres")?;

        let rules = Arc::new(PostgresRuleStore::new(pool.clone()));
        Ok(Self::from_parts(
            rules.clone(),
            rules,
            Arc::new(PostgresUserDirectory::new(pool)),
        ))
    }

    /// Delete a role, its rules, and every user's reference to it.
    pub async fn delete_role(&self, id: RoleId) -> Result<u64, AdminError> {
        self.admin.delete_role(id).await?;
        let detached = self.users.clear_role(id).await?;
        tracing::info!(role_id = %id, detached, "role removed from users");
        Ok(detached)
    }
}

#[cfg(test)]
mod tests {
    use rolegate_auth::Verb;

    use super::*;

    #[tokio::test]
    async fn deleting_a_role_strands_its_users() {
        let (services, demo) = AppServices::in_memory_seeded().await.unwrap();

        let detached = services.delete_role(demo.roles.user.id).await.unwrap();
        assert_eq!(detached, 1);

        let user = services.users.get(demo.user.id).await.unwrap().unwrap();
        assert_eq!(user.role, None);
        let decision = services
            .engine
            .evaluate(&user.actor(), "products", Verb::Read)
            .await
            .unwrap();
        assert!(!decision.is_allowed());

        let admin = services.users.get(demo.admin.id).await.unwrap().unwrap();
        assert_eq!(admin.actor().role(), Some(demo.roles.admin.id));
    }
}
