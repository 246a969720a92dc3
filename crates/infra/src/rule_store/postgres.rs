//! Postgres-backed rule matrix.
//!
//! Expected tables (created by deployment tooling, not by this crate):
//!
//! ```sql
//! CREATE TABLE roles (
//!     id   UUID PRIMARY KEY,
//!     name VARCHAR(50) NOT NULL UNIQUE
//! );
//! CREATE TABLE business_elements (
//!     id   UUID PRIMARY KEY,
//!     name VARCHAR(100) NOT NULL UNIQUE
//! );
//! CREATE TABLE access_role_rules (
//!     id         UUID PRIMARY KEY,
//!     role_id    UUID NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
//!     element_id UUID NOT NULL REFERENCES business_elements(id) ON DELETE CASCADE,
//!     read_own   BOOLEAN NOT NULL DEFAULT FALSE,
//!     read_all   BOOLEAN NOT NULL DEFAULT FALSE,
//!     "create"   BOOLEAN NOT NULL DEFAULT FALSE,
//!     update_own BOOLEAN NOT NULL DEFAULT FALSE,
//!     update_all BOOLEAN NOT NULL DEFAULT FALSE,
//!     delete_own BOOLEAN NOT NULL DEFAULT FALSE,
//!     delete_all BOOLEAN NOT NULL DEFAULT FALSE,
//!     UNIQUE (role_id, element_id)
//! );
//! ```
//!
//! ## Error Mapping
//!
//! | SQLx error | Code | Result |
//! |------------|------|--------|
//! | unique violation | `23505` | `DomainError::Conflict` |
//! | foreign key violation | `23503` | `DomainError::NotFound` |
//! | row decode failure | n/a | `StoreError::Corrupted` |
//! | anything else | n/a | `StoreError::Unavailable` |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use rolegate_auth::{
    AccessRoleRule, AdminError, BusinessElement, PermissionFlags, Role, RuleAdmin, RuleStore,
    StoreError,
};
use rolegate_core::{DomainError, ElementId, RoleId, RuleId};

const RULE_COLUMNS: &str = r#"r.id, r.role_id, r.element_id, r.read_own, r.read_all, r."create",
    r.update_own, r.update_all, r.delete_own, r.delete_all"#;

/// Rule store over a Postgres pool. `Send + Sync`; clone freely.
#[derive(Debug, Clone)]
pub struct PostgresRuleStore {
    pool: Arc<PgPool>,
}

impl PostgresRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl RuleStore for PostgresRuleStore {
    #[instrument(skip(self), err)]
    async fn find_element(&self, name: &str) -> Result<Option<BusinessElement>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM business_elements WHERE name = $1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| unavailable("find_element", e))?;

        row.as_ref().map(element_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_rule(
        &self,
        role: RoleId,
        element: ElementId,
    ) -> Result<Option<AccessRoleRule>, StoreError> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM access_role_rules r WHERE r.role_id = $1 AND r.element_id = $2"
        );
        let row = sqlx::query(&sql)
            .bind(role.as_uuid())
            .bind(element.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| unavailable("find_rule", e))?;

        row.as_ref().map(rule_from_row).transpose()
    }

    /// One round trip: unknown element and missing rule both yield no row.
    #[instrument(skip(self), err)]
    async fn lookup_rule(
        &self,
        role: RoleId,
        element_name: &str,
    ) -> Result<Option<AccessRoleRule>, StoreError> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM access_role_rules r \
             JOIN business_elements e ON e.id = r.element_id \
             WHERE r.role_id = $1 AND e.name = $2"
        );
        let row = sqlx::query(&sql)
            .bind(role.as_uuid())
            .bind(element_name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| unavailable("lookup_rule", e))?;

        row.as_ref().map(rule_from_row).transpose()
    }
}

#[async_trait]
impl RuleAdmin for PostgresRuleStore {
    async fn create_role(&self, name: &str) -> Result<Role, AdminError> {
        let role = Role::new(name)?;
        sqlx::query("INSERT INTO roles (id, name) VALUES ($1, $2)")
            .bind(role.id.as_uuid())
            .bind(&role.name)
            .execute(&*self.pool)
            .await
            .map_err(|e| admin_error("create_role", e))?;
        tracing::info!(role = %role.name, "role created");
        Ok(role)
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, AdminError> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| unavailable("get_role", e))?;
        Ok(row.as_ref().map(role_from_row).transpose()?)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, AdminError> {
        let rows = sqlx::query("SELECT id, name FROM roles ORDER BY name")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| unavailable("list_roles", e))?;
        Ok(rows.iter().map(role_from_row).collect::<Result<_, _>>()?)
    }

    async fn delete_role(&self, id: RoleId) -> Result<(), AdminError> {
        let done = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| admin_error("delete_role", e))?;
        if done.rows_affected() == 0 {
            return Err(DomainError::not_found("role").into());
        }
        tracing::info!(role_id = %id, "role deleted");
        Ok(())
    }

    async fn create_element(&self, name: &str) -> Result<BusinessElement, AdminError> {
        let element = BusinessElement::new(name)?;
        sqlx::query("INSERT INTO business_elements (id, name) VALUES ($1, $2)")
            .bind(element.id.as_uuid())
            .bind(&element.name)
            .execute(&*self.pool)
            .await
            .map_err(|e| admin_error("create_element", e))?;
        tracing::info!(element = %element.name, "business element created");
        Ok(element)
    }

    async fn list_elements(&self) -> Result<Vec<BusinessElement>, AdminError> {
        let rows = sqlx::query("SELECT id, name FROM business_elements ORDER BY name")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| unavailable("list_elements", e))?;
        Ok(rows.iter().map(element_from_row).collect::<Result<_, _>>()?)
    }

    async fn delete_element(&self, id: ElementId) -> Result<(), AdminError> {
        let done = sqlx::query("DELETE FROM business_elements WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| admin_error("delete_element", e))?;
        if done.rows_affected() == 0 {
            return Err(DomainError::not_found("business element").into());
        }
        tracing::info!(element_id = %id, "business element deleted");
        Ok(())
    }

    async fn grant(
        &self,
        role: RoleId,
        element: ElementId,
        flags: PermissionFlags,
    ) -> Result<AccessRoleRule, AdminError> {
        let rule = AccessRoleRule::new(role, element, flags);
        sqlx::query(
            r#"
            INSERT INTO access_role_rules
                (id, role_id, element_id, read_own, read_all, "create",
                 update_own, update_all, delete_own, delete_all)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(rule.id.as_uuid())
        .bind(role.as_uuid())
        .bind(element.as_uuid())
        .bind(flags.read_own)
        .bind(flags.read_all)
        .bind(flags.create)
        .bind(flags.update_own)
        .bind(flags.update_all)
        .bind(flags.delete_own)
        .bind(flags.delete_all)
        .execute(&*self.pool)
        .await
        .map_err(|e| admin_error("grant", e))?;
        tracing::info!(rule_id = %rule.id, role_id = %role, element_id = %element, "rule granted");
        Ok(rule)
    }

    async fn update_rule(
        &self,
        id: RuleId,
        flags: PermissionFlags,
    ) -> Result<AccessRoleRule, AdminError> {
        let sql = format!(
            r#"UPDATE access_role_rules r
               SET read_own = $2, read_all = $3, "create" = $4,
                   update_own = $5, update_all = $6, delete_own = $7, delete_all = $8
               WHERE r.id = $1
               RETURNING {RULE_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(flags.read_own)
            .bind(flags.read_all)
            .bind(flags.create)
            .bind(flags.update_own)
            .bind(flags.update_all)
            .bind(flags.delete_own)
            .bind(flags.delete_all)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| admin_error("update_rule", e))?
            .ok_or_else(|| DomainError::not_found("rule"))?;
        tracing::info!(rule_id = %id, "rule updated");
        Ok(rule_from_row(&row)?)
    }

    async fn revoke(&self, id: RuleId) -> Result<(), AdminError> {
        let done = sqlx::query("DELETE FROM access_role_rules WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| admin_error("revoke", e))?;
        if done.rows_affected() == 0 {
            return Err(DomainError::not_found("rule").into());
        }
        tracing::info!(rule_id = %id, "rule revoked");
        Ok(())
    }

    async fn list_rules(&self) -> Result<Vec<AccessRoleRule>, AdminError> {
        let sql = format!("SELECT {RULE_COLUMNS} FROM access_role_rules r ORDER BY r.id");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| unavailable("list_rules", e))?;
        Ok(rows.iter().map(rule_from_row).collect::<Result<_, _>>()?)
    }
}

fn role_from_row(row: &PgRow) -> Result<Role, StoreError> {
    Ok(Role {
        id: RoleId::from_uuid(row.try_get("id").map_err(corrupted)?),
        name: row.try_get("name").map_err(corrupted)?,
    })
}

fn element_from_row(row: &PgRow) -> Result<BusinessElement, StoreError> {
    Ok(BusinessElement {
        id: ElementId::from_uuid(row.try_get("id").map_err(corrupted)?),
        name: row.try_get("name").map_err(corrupted)?,
    })
}

fn rule_from_row(row: &PgRow) -> Result<AccessRoleRule, StoreError> {
    let flag = |col: &str| row.try_get::<bool, _>(col).map_err(corrupted);
    Ok(AccessRoleRule {
        id: RuleId::from_uuid(row.try_get("id").map_err(corrupted)?),
        role_id: RoleId::from_uuid(row.try_get("role_id").map_err(corrupted)?),
        element_id: ElementId::from_uuid(row.try_get("element_id").map_err(corrupted)?),
        flags: PermissionFlags {
            read_own: flag("read_own")?,
            read_all: flag("read_all")?,
            create: flag("create")?,
            update_own: flag("update_own")?,
            update_all: flag("update_all")?,
            delete_own: flag("delete_own")?,
            delete_all: flag("delete_all")?,
        },
    })
}

pub(crate) fn corrupted(err: sqlx::Error) -> StoreError {
    StoreError::Corrupted(err.to_string())
}

pub(crate) fn unavailable(operation: &str, err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(format!("{operation}: {err}"))
}

/// Map constraint violations onto domain errors; everything else is a store failure.
pub(crate) fn admin_error(operation: &str, err: sqlx::Error) -> AdminError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23505") => {
                return DomainError::conflict(format!("{operation}: {}", db_err.message())).into();
            }
            Some("23503") => {
                return DomainError::not_found(format!("{operation}: referenced record")).into();
            }
            _ => {}
        }
    }
    unavailable(operation, err).into()
}
