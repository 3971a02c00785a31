//! # User Repository (email-service view)
//!
//! The email service shares the `users` table with the auth service but
//! touches only the columns its flows need: verification state and the
//! password-reset transition.
//!
//! The reset transition is the platform's epoch bump: in one transaction
//! the hash changes, the lockout counters clear, `token_version`
//! increments, every refresh token is deleted, and every session is
//! deactivated. Every JWT issued before the commit dies with it.

use shared::errors::ApiError;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::UserRecord;

/// Columns of the shared `users` table this service reads.
const USER_COLUMNS: &str = "id, email, email_verified, token_version";

/// Repository for the email service's slice of the `users` table.
#[derive(Debug, Clone)]
pub struct UserRepository {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new repository instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Starts a transaction on the underlying pool.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, ApiError> {
        self.pool.begin().await.map_err(ApiError::DatabaseError)
    }

    /// Finds a user by email address (already normalized to lowercase).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, ApiError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by id.
    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, ApiError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by id and locks the row for the transaction.
    pub async fn find_by_id_for_update(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Option<UserRecord>, ApiError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(user)
    }

    /// Marks the user's email address verified.
    pub async fn mark_email_verified(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE users SET email_verified = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Applies a password reset: new hash, counters cleared, epoch bumped.
    ///
    /// `token_version = token_version + 1` is the global invalidation: the
    /// auth service compares the stored value against every presented JWT.
    pub async fn apply_password_reset(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1,
                failed_login_attempts = 0,
                account_locked_until = NULL,
                token_version = token_version + 1,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Deletes every refresh token for a user (reset flow).
    pub async fn delete_refresh_tokens(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deactivates every session for a user (reset flow).
    pub async fn deactivate_sessions(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<u64, ApiError> {
        let result =
            sqlx::query("UPDATE sessions SET is_active = FALSE WHERE user_id = $1 AND is_active")
                .bind(user_id)
                .execute(conn)
                .await?;

        Ok(result.rows_affected())
    }
}
