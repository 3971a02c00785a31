//! # Refresh Token Repository
//!
//! Data access for the `refresh_tokens` table - the bare credential index.
//!
//! A row exists for exactly as long as its token is redeemable: rotation
//! deletes the old row in the same transaction that inserts its successor
//! (refresh exclusivity), logout and password reset delete outright, and
//! the sweeper removes expired leftovers.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::RefreshTokenRecord;

/// Repository for refresh token rows.
#[derive(Debug, Clone)]
pub struct RefreshTokenRepository {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl RefreshTokenRepository {
    /// Creates a new repository instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a freshly issued token inside a caller-owned transaction.
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, ApiError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(conn)
        .await?;

        Ok(record)
    }

    /// Finds a token row by exact value and locks it for the transaction.
    ///
    /// The row lock makes rotation exclusive: a concurrent refresh with the
    /// same token blocks here and then observes the deletion.
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, ApiError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT * FROM refresh_tokens WHERE token = $1 FOR UPDATE",
        )
        .bind(token)
        .fetch_optional(conn)
        .await?;

        Ok(record)
    }

    /// Deletes a token row by exact value inside a transaction.
    pub async fn delete_by_token_tx(
        &self,
        conn: &mut PgConnection,
        token: &str,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a token row by exact value on the pool.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes all of a user's tokens. Returns the count.
    pub async fn delete_all_for_user(
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

    /// Deletes all of a user's tokens except the given one. Returns the count.
    pub async fn delete_all_except(
        &self,
        user_id: Uuid,
        current_token: &str,
    ) -> Result<u64, ApiError> {
        let result =
            sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND token <> $2")
                .bind(user_id)
                .bind(current_token)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    /// Lists a user's token rows (GDPR export: ids and lifetimes only -
    /// the caller must never serialize the token values).
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, ApiError> {
        let records = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT * FROM refresh_tokens WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Deletes expired token rows. Returns the count.
    pub async fn sweep_expired(&self) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
