//! # Magic Link Token Repository
//!
//! Data access for the `magic_link_tokens` table.
//!
//! Magic-link tokens are one-shot: redemption flips `used = TRUE` under a
//! row lock, and the row is retained (with redemption IP/UA) for audit.
//! Only the most recent unused token per user matters - issuance purges its
//! unused predecessors. The sweeper removes expired rows and used rows
//! older than seven days.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::MagicLinkToken;

/// Days a redeemed token is retained before the sweeper deletes it.
const USED_RETENTION_DAYS: i32 = 7;

/// Repository for magic-link token rows.
#[derive(Debug, Clone)]
pub struct MagicLinkRepository {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl MagicLinkRepository {
    /// Creates a new repository instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Deletes the user's unused tokens (issuance purges predecessors).
    pub async fn delete_unused_for_user(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let result =
            sqlx::query("DELETE FROM magic_link_tokens WHERE user_id = $1 AND used = FALSE")
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
    ) -> Result<MagicLinkToken, ApiError> {
        let row = sqlx::query_as::<_, MagicLinkToken>(
            r#"
            INSERT INTO magic_link_tokens (user_id, token, expires_at)
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
    /// The lock serializes concurrent redemptions of the same link; the
    /// loser of the race observes `used = TRUE`.
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        token: &str,
    ) -> Result<Option<MagicLinkToken>, ApiError> {
        let row = sqlx::query_as::<_, MagicLinkToken>(
            "SELECT * FROM magic_link_tokens WHERE token = $1 FOR UPDATE",
        )
        .bind(token)
        .fetch_optional(conn)
        .await?;

        Ok(row)
    }

    /// Marks a token consumed, recording the redeeming request's context.
    pub async fn mark_used(
        &self,
        conn: &mut PgConnection,
        token_id: Uuid,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE magic_link_tokens
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

    /// Deletes a row by id (amortized cleanup on expiry rejection).
    pub async fn delete_by_id(
        &self,
        conn: &mut PgConnection,
        token_id: Uuid,
    ) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM magic_link_tokens WHERE id = $1")
            .bind(token_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Deletes every token row for a user (GDPR anonymize / delete).
    pub async fn delete_all_for_user(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM magic_link_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes expired rows plus used rows past the retention window.
    /// Returns the count.
    pub async fn sweep(&self) -> Result<u64, ApiError> {
        let result = sqlx::query(
            r#"
            DELETE FROM magic_link_tokens
            WHERE expires_at < NOW()
               OR (used = TRUE AND used_at < NOW() - make_interval(days => $1))
            "#,
        )
        .bind(USED_RETENTION_DAYS)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
