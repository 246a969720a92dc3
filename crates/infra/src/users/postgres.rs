//! Postgres-backed user directory.
//!
//! ```sql
//! CREATE TABLE users (
//!     id          UUID PRIMARY KEY,
//!     email       VARCHAR(254) NOT NULL UNIQUE,
//!     first_name  VARCHAR(50) NOT NULL,
//!     last_name   VARCHAR(50),
//!     middle_name VARCHAR(50),
//!     is_active   BOOLEAN NOT NULL DEFAULT TRUE,
//!     role_id     UUID REFERENCES roles(id) ON DELETE SET NULL,
//!     date_joined TIMESTAMPTZ NOT NULL
//! );
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use rolegate_auth::{AdminError, ProfileUpdate, StoreError, User, UserDirectory};
use rolegate_core::{DomainError, RoleId, UserId};

use crate::rule_store::postgres::{admin_error, corrupted, unavailable};

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, middle_name, is_active, role_id, date_joined";

#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: Arc<PgPool>,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn fetch(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| unavailable("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.fetch(id).await
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY email");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| unavailable("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    async fn insert(&self, user: User) -> Result<User, AdminError> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, email, first_name, last_name, middle_name, is_active, role_id, date_joined)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.middle_name)
        .bind(user.is_active)
        .bind(user.role.map(|r| *r.as_uuid()))
        .bind(user.date_joined)
        .execute(&*self.pool)
        .await
        .map_err(|e| admin_error("insert_user", e))?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Row-locks the user for the read-modify-write; only the profile columns
    /// are written back.
    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
        partial: bool,
    ) -> Result<User, AdminError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| unavailable("update_profile", e))?;

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| unavailable("update_profile", e))?
            .ok_or_else(|| DomainError::not_found("user"))?;

        let mut user = user_from_row(&row)?;
        user.apply_profile(update, partial)?;

        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, first_name = $3, last_name = $4, middle_name = $5
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.middle_name)
        .execute(&mut *tx)
        .await
        .map_err(|e| admin_error("update_profile", e))?;

        tx.commit()
            .await
            .map_err(|e| unavailable("update_profile", e))?;
        Ok(user)
    }

    async fn assign_role(&self, id: UserId, role: Option<RoleId>) -> Result<User, AdminError> {
        let done = sqlx::query("UPDATE users SET role_id = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(role.map(|r| *r.as_uuid()))
            .execute(&*self.pool)
            .await
            .map_err(|e| admin_error("assign_role", e))?;
        if done.rows_affected() == 0 {
            return Err(DomainError::not_found("user").into());
        }
        tracing::info!(user_id = %id, role_id = ?role, "user role assigned");
        self.fetch(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user").into())
    }

    async fn deactivate(&self, id: UserId) -> Result<User, AdminError> {
        let done = sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| admin_error("deactivate_user", e))?;
        if done.rows_affected() == 0 {
            return Err(DomainError::not_found("user").into());
        }
        tracing::info!(user_id = %id, "user deactivated");
        self.fetch(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user").into())
    }

    /// Zero after a role delete, since `ON DELETE SET NULL` got there first.
    async fn clear_role(&self, role: RoleId) -> Result<u64, StoreError> {
        let done = sqlx::query("UPDATE users SET role_id = NULL WHERE role_id = $1")
            .bind(role.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| unavailable("clear_role", e))?;
        Ok(done.rows_affected())
    }
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: Option<Uuid> = row.try_get("role_id").map_err(corrupted)?;
    let date_joined: DateTime<Utc> = row.try_get("date_joined").map_err(corrupted)?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id").map_err(corrupted)?),
        email: row.try_get("email").map_err(corrupted)?,
        first_name: row.try_get("first_name").map_err(corrupted)?,
        last_name: row.try_get("last_name").map_err(corrupted)?,
        middle_name: row.try_get("middle_name").map_err(corrupted)?,
        is_active: row.try_get("is_active").map_err(corrupted)?,
        role: role.map(RoleId::from_uuid),
        date_joined,
    })
}
