//! # Session Repository
//!
//! Data access for the `sessions` table - one row per refresh-token-bearing
//! login, carrying device and network context.
//!
//! The `(user_id, refresh_token)` pair uniquely identifies a session; the
//! `refresh_token` column itself is unique across the table. Deactivation
//! (`is_active = FALSE`) is the terminal state for logout, rotation,
//! revocation, and password reset; expired rows are deactivated by the
//! sweeper.

use shared::errors::ApiError;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::{NewSession, Session};

/// Repository for session rows.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl SessionRepository {
    /// Creates a new repository instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Starts a transaction on the underlying pool.
    pub async fn begin(
        &self,
    ) -> Result<sqlx::Transaction<'static, sqlx::Postgres>, ApiError> {
        self.pool.begin().await.map_err(ApiError::DatabaseError)
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Creates a session inside a caller-owned transaction.
    ///
    /// Paired with the refresh-token insert so a login either produces both
    /// rows or neither.
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        new_session: NewSession,
    ) -> Result<Session, ApiError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (
                user_id, refresh_token, device_name, device_type, browser,
                os, ip_address, is_active, last_activity_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, NOW(), $8)
            RETURNING *
            "#,
        )
        .bind(new_session.user_id)
        .bind(&new_session.refresh_token)
        .bind(&new_session.device_name)
        .bind(&new_session.device_type)
        .bind(&new_session.browser)
        .bind(&new_session.os)
        .bind(&new_session.ip_address)
        .bind(new_session.expires_at)
        .fetch_one(conn)
        .await?;

        Ok(session)
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Lists a user's active, unexpired sessions, most recently active first.
    pub async fn list_active(&self, user_id: Uuid) -> Result<Vec<Session>, ApiError> {
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = $1 AND is_active = TRUE AND expires_at >= NOW()
            ORDER BY last_activity_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Finds a session by id, scoped to its owner.
    ///
    /// Returns `None` both for unknown ids and for sessions owned by
    /// someone else - callers surface the same "not found" either way.
    pub async fn find_owned(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Session>, ApiError> {
        let session =
            sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1 AND user_id = $2")
                .bind(session_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(session)
    }

    /// Lists every session a user has ever held (GDPR export).
    pub async fn list_all_for_user(&self, user_id: Uuid) -> Result<Vec<Session>, ApiError> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    // =========================================================================
    // DEACTIVATION
    // =========================================================================

    /// Deactivates the session carrying the given refresh token.
    pub async fn deactivate_by_token(
        &self,
        conn: &mut PgConnection,
        refresh_token: &str,
    ) -> Result<(), ApiError> {
        sqlx::query("UPDATE sessions SET is_active = FALSE WHERE refresh_token = $1")
            .bind(refresh_token)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Deactivates a single session by id.
    pub async fn deactivate_by_id(&self, session_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("UPDATE sessions SET is_active = FALSE WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Deactivates all of a user's active sessions. Returns the count.
    pub async fn deactivate_all(
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

    /// Deactivates all of a user's active sessions except the current one.
    /// Returns the count.
    pub async fn deactivate_all_except(
        &self,
        user_id: Uuid,
        current_refresh_token: &str,
    ) -> Result<u64, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = FALSE
            WHERE user_id = $1 AND is_active AND refresh_token <> $2
            "#,
        )
        .bind(user_id)
        .bind(current_refresh_token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // CLEANUP
    // =========================================================================

    /// Deletes every session row for a user (GDPR anonymize / delete).
    pub async fn delete_all_for_user(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deactivates sessions whose expiry has passed. Returns the count.
    pub async fn sweep_expired(&self) -> Result<u64, ApiError> {
        let result =
            sqlx::query("UPDATE sessions SET is_active = FALSE WHERE is_active AND expires_at < NOW()")
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::domain::NewSession;
    use chrono::Utc;
    use uuid::Uuid;

    // Query execution requires a live database; covered by the integration
    // environment.

    #[test]
    fn test_new_session_carries_device_context() {
        let new_session = NewSession {
            user_id: Uuid::new_v4(),
            refresh_token: "token".to_string(),
            device_name: Some("iPhone".to_string()),
            device_type: Some("mobile".to_string()),
            browser: Some("Safari".to_string()),
            os: Some("iOS".to_string()),
            ip_address: Some("203.0.113.7".to_string()),
            expires_at: Utc::now(),
        };

        assert_eq!(new_session.device_type.as_deref(), Some("mobile"));
        assert_eq!(new_session.browser.as_deref(), Some("Safari"));
    }
}
