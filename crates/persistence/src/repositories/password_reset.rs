//! Password reset request repository.

use sqlx::PgPool;

use crate::entities::PasswordResetEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct PasswordResetRepository {
    pool: PgPool,
}

impl PasswordResetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a reset token for an email, replacing any earlier one.
    pub async fn replace(&self, email: &str, token_hash: &str) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("replace_password_reset");
        sqlx::query(
            r#"
            INSERT INTO password_resets (email, token_hash, created_at)
            VALUES (LOWER($1), $2, NOW())
            ON CONFLICT (email) DO UPDATE
            SET token_hash = EXCLUDED.token_hash, created_at = EXCLUDED.created_at
            "#,
        )
        .bind(email.trim())
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(())
    }

    pub async fn find(&self, email: &str) -> Result<Option<PasswordResetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_password_reset");
        let result = sqlx::query_as::<_, PasswordResetEntity>(
            "SELECT email, token_hash, created_at FROM password_resets WHERE email = LOWER($1)",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete(&self, email: &str) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("delete_password_reset");
        sqlx::query("DELETE FROM password_resets WHERE email = LOWER($1)")
            .bind(email.trim())
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(())
    }
}
