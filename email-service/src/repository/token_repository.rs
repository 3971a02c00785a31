//! # Out-of-band Token Repositories
//!
//! Data access for `verification_tokens` and `password_reset_tokens`.
//!
//! Minting always purges the user's prior unused rows of the same kind,
//! so at most one live token exists per `(user, kind)`. Expiry rejection
//! deletes the row as a side effect (amortized cleanup); the sweeper
//! removes whatever expires unobserved.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::{PasswordResetToken, VerificationToken};

// =============================================================================
// VERIFICATION TOKENS
// =============================================================================

/// Repository for email verification tokens (consumed by deletion).
#[derive(Debug, Clone)]
pub struct VerificationTokenRepository {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl VerificationTokenRepository {
    /// Creates a new repository instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Deletes the user's existing tokens (minting purges predecessors).
    pub async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Inserts a freshly minted token.
    pub async fn insert(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationToken, ApiError> {
        let row = sqlx::query_as::<_, VerificationToken>(
            r#"
            INSERT INTO verification_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Finds a token by exact value and locks the row.
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        token: &str,
    ) -> Result<Option<VerificationToken>, ApiError> {
        let row = sqlx::query_as::<_, VerificationToken>(
            "SELECT * FROM verification_tokens WHERE token = $1 FOR UPDATE",
        )
        .bind(token)
        .fetch_optional(conn)
        .await?;

        Ok(row)
    }

    /// Deletes a row by id (consumption or amortized expiry cleanup).
    pub async fn delete_by_id(
        &self,
        conn: &mut PgConnection,
        token_id: Uuid,
    ) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM verification_tokens WHERE id = $1")
            .bind(token_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Deletes expired rows. Returns the count.
    pub async fn sweep_expired(&self) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// PASSWORD RESET TOKENS
// =============================================================================

/// Repository for password reset tokens (consumed by `used = TRUE`).
#[derive(Debug, Clone)]
pub struct PasswordResetTokenRepository {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl PasswordResetTokenRepository {
    /// Creates a new repository instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Deletes the user's unused tokens (minting purges predecessors).
    pub async fn delete_unused_for_user(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let result =
            sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1 AND used = FALSE")
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    /// Inserts a freshly minted token.
    pub async fn insert(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken, ApiError> {
        let row = sqlx::query_as::<_, PasswordResetToken>(
            r#"
            INSERT INTO password_reset_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Finds a token by exact value and locks the row.
    ///
    /// The lock serializes concurrent reset attempts with the same token;
    /// the loser observes `used = TRUE`.
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        token: &str,
    ) -> Result<Option<PasswordResetToken>, ApiError> {
        let row = sqlx::query_as::<_, PasswordResetToken>(
            "SELECT * FROM password_reset_tokens WHERE token = $1 FOR UPDATE",
        )
        .bind(token)
        .fetch_optional(conn)
        .await?;

        Ok(row)
    }

    /// Marks a token consumed, recording the request's context.
    pub async fn mark_used(
        &self,
        conn: &mut PgConnection,
        token_id: Uuid,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE password_reset_tokens
            SET used = TRUE, used_at = NOW(), ip_address = $1, user_agent = $2
            WHERE id = $3
            "#,
        )
        .bind(ip_address)
        .bind(user_agent)
        .bind(token_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Deletes a row by id (amortized expiry cleanup).
    pub async fn delete_by_id(
        &self,
        conn: &mut PgConnection,
        token_id: Uuid,
    ) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM password_reset_tokens WHERE id = $1")
            .bind(token_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Deletes expired rows. Returns the count.
    pub async fn sweep_expired(&self) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
