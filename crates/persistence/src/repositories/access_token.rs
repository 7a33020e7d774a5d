//! Personal access token repository.
//!
//! Tokens are looked up by the SHA-256 of the presented value; the raw token
//! never reaches the database.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::entities::{AccessTokenEntity, UserEntity};
use crate::metrics::QueryTimer;

/// A token joined with the user that owns it.
#[derive(Debug, Clone, FromRow)]
pub struct TokenOwnerRow {
    pub token_id: i64,
    pub expires_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    pub user: UserEntity,
}

#[derive(Clone)]
pub struct AccessTokenRepository {
    pool: PgPool,
}

impl AccessTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a newly issued token.
    pub async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessTokenEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_access_token");
        let result = sqlx::query_as::<_, AccessTokenEntity>(
            r#"
            INSERT INTO personal_access_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, last_used_at, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Resolve a token hash to its owner.
    pub async fn find_owner(&self, token_hash: &str) -> Result<Option<TokenOwnerRow>, sqlx::Error> {
        let timer = QueryTimer::new("find_access_token_owner");
        let result = sqlx::query_as::<_, TokenOwnerRow>(
            r#"
            SELECT t.id AS token_id, t.expires_at,
                   u.id, u.name, u.email, u.password_hash, u.role, u.created_at, u.updated_at
            FROM personal_access_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Record token usage.
    pub async fn touch(&self, token_id: i64) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("touch_access_token");
        sqlx::query("UPDATE personal_access_tokens SET last_used_at = NOW() WHERE id = $1")
            .bind(token_id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(())
    }

    /// Revoke one token.
    pub async fn delete_by_hash(&self, token_hash: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_access_token");
        let result = sqlx::query("DELETE FROM personal_access_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every token of a user.
    pub async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_user_access_tokens");
        let result = sqlx::query("DELETE FROM personal_access_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected())
    }
}
