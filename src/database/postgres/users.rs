//! PostgreSQL user repository
use crate::core::repository::{NewUser, Page, Result, UserRepository};
use crate::core::types::{Role, User, UserId};
use crate::database::client::Database;
use crate::database::models::{UserRow, convert_all};
use crate::database::postgres::{map_write_error, not_found};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, name, role, wallet_address, is_nft_holder, nft_verified_at, created_at";

pub struct PostgresUserRepository {
    db: Arc<Database>,
}

impl PostgresUserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (id, email, password_hash, name, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(user.role.as_str())
            .fetch_one(&self.db.pool)
            .await
            .map_err(|e| map_write_error(e, "email already registered"))?;
        row.try_into()
    }

    async fn get(&self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row: Option<UserRow> =
            sqlx::query_as(&sql).bind(id.value()).fetch_optional(&self.db.pool).await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row: Option<UserRow> =
            sqlx::query_as(&sql).bind(email).fetch_optional(&self.db.pool).await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn update_wallet(
        &self,
        id: UserId,
        wallet_address: Option<String>,
        is_nft_holder: bool,
        verified_at: DateTime<Utc>,
    ) -> Result<User> {
        let sql = format!(
            "UPDATE users
             SET wallet_address = $2, is_nft_holder = $3, nft_verified_at = $4, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id.value())
            .bind(wallet_address)
            .bind(is_nft_holder)
            .bind(verified_at)
            .fetch_optional(&self.db.pool)
            .await?;
        row.ok_or_else(|| not_found("user", id))?.try_into()
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<User> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id.value())
            .bind(role.as_str())
            .fetch_optional(&self.db.pool)
            .await?;
        row.ok_or_else(|| not_found("user", id))?.try_into()
    }

    async fn list(&self, page: Page) -> Result<Vec<User>> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2");
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.db.pool)
            .await?;
        convert_all(rows)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&self.db.pool).await?;
        Ok(count)
    }

    async fn stale_wallets(&self, before: DateTime<Utc>, limit: i64) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE wallet_address IS NOT NULL
               AND (nft_verified_at IS NULL OR nft_verified_at < $1)
             ORDER BY nft_verified_at NULLS FIRST
             LIMIT $2"
        );
        let rows: Vec<UserRow> =
            sqlx::query_as(&sql).bind(before).bind(limit).fetch_all(&self.db.pool).await?;
        convert_all(rows)
    }
}
