//! # User Repository
//!
//! Data access for the `users` table.
//!
//! ## Query Patterns
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │ Pattern          │ Example                                              │
//! ├──────────────────┼──────────────────────────────────────────────────────┤
//! │ Row lock         │ SELECT ... FOR UPDATE (login / redemption / reset)   │
//! │ Returning        │ INSERT/UPDATE ... RETURNING * (generated fields)     │
//! │ Parameterized    │ Always $1, $2 (never string interpolation)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Methods with a `_tx` suffix take `&mut PgConnection` and participate in a
//! caller-owned transaction; the rest run against the pool. The login,
//! rotation, redemption, and reset flows lock the user row first so racing
//! requests serialize on it.
//!
//! ## Error Handling
//!
//! | sqlx Error | ApiError Variant | HTTP Status |
//! |-----------------------|------------------|-------------|
//! | Unique constraint | `Conflict` | 409 |
//! | Other | `DatabaseError` | 500 |

use shared::errors::ApiError;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{NewUser, User};

/// Repository for user rows.
///
/// `Send + Sync` because `PgPool` is `Arc`-based internally; clone freely
/// across workers.
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
    ///
    /// The multi-row state transitions (login + lockout, rotation, magic
    /// redemption, password reset) run entirely inside one transaction.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, ApiError> {
        self.pool.begin().await.map_err(ApiError::DatabaseError)
    }

    // =========================================================================
    // CREATE / FIND
    // =========================================================================

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// - `ApiError::Conflict` if the email is already registered
    pub async fn create(&self, new_user: NewUser) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, role, email_verified)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.role)
        .bind(new_user.email_verified)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_unique_email)?;

        Ok(user)
    }

    /// Finds a user by email address (already normalized to lowercase).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by their unique ID.
    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by email and locks the row for the enclosing transaction.
    ///
    /// The row lock serializes concurrent login attempts for the same user,
    /// so the attempt counter and lock transition cannot race.
    pub async fn find_by_email_for_update(
        &self,
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 FOR UPDATE")
            .bind(email)
            .fetch_optional(conn)
            .await?;

        Ok(user)
    }

    /// Finds a user by id and locks the row for the enclosing transaction.
    pub async fn find_by_id_for_update(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;

        Ok(user)
    }

    /// Checks if an email is already registered.
    pub async fn email_exists(&self, email: &str) -> Result<bool, ApiError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0 > 0)
    }

    /// Lists all users, newest first.
    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    // =========================================================================
    // LOGIN STATE TRANSITIONS (transactional)
    // =========================================================================

    /// Records a successful credential validation.
    ///
    /// Resets the failure counter, clears any lock, and stamps the login.
    pub async fn record_login_success(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        ip_address: Option<&str>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = 0,
                account_locked_until = NULL,
                last_login_at = NOW(),
                last_login_ip = $1,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(ip_address)
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Records a failed password attempt.
    ///
    /// The caller computes the new counter and optional lock instant from
    /// the lockout policy; this method persists them atomically with the
    /// row lock still held.
    pub async fn record_login_failure(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        attempts: i32,
        locked_until: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = $1,
                account_locked_until = $2,
                updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(attempts)
        .bind(locked_until)
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Clears an expired lock and resets the counter.
    pub async fn clear_lockout(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = 0,
                account_locked_until = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    // =========================================================================
    // VERIFICATION / MAGIC LINK TRANSITIONS
    // =========================================================================

    /// Marks the email verified and stamps a login in one step.
    ///
    /// Magic-link redemption proves possession of the address, so the
    /// verify flip and the login bookkeeping land together.
    pub async fn record_magic_login(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        ip_address: Option<&str>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE users
            SET email_verified = TRUE,
                failed_login_attempts = 0,
                account_locked_until = NULL,
                last_login_at = NOW(),
                last_login_ip = $1,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(ip_address)
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    // =========================================================================
    // ADMIN OPERATIONS
    // =========================================================================

    /// Updates a user's role, returning the updated row.
    pub async fn update_role(&self, user_id: Uuid, role: &str) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(role)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", user_id) })?;

        Ok(user)
    }

    /// Deletes a user; dependent rows cascade at the schema level.
    pub async fn delete(&self, user_id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: format!("user:{}", user_id) });
        }

        Ok(())
    }

    /// Deletes every non-admin user. Returns the count.
    pub async fn delete_all_non_admins(&self) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE role <> 'ADMIN'")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes every user except the given one. Returns the count.
    pub async fn delete_all_except(&self, keep_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id <> $1")
            .bind(keep_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // GDPR OPERATIONS
    // =========================================================================

    /// Scrubs the user row in place for anonymization.
    ///
    /// The row itself is retained to preserve foreign-key integrity with
    /// the audit trail.
    pub async fn anonymize(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        anonymized_email: &str,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = $1,
                password_hash = 'anonymized',
                email_verified = FALSE,
                failed_login_attempts = 0,
                account_locked_until = NULL,
                last_login_at = NULL,
                last_login_ip = NULL,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(anonymized_email)
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Changes the email address, resetting verification.
    ///
    /// # Errors
    ///
    /// - `ApiError::Conflict` if another user holds the address
    pub async fn update_email(&self, user_id: Uuid, new_email: &str) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $1, email_verified = FALSE, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(new_email)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_unique_email)?
        .ok_or_else(|| ApiError::NotFound { resource: format!("user:{}", user_id) })?;

        Ok(user)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Maps a unique-constraint violation on the email index to `Conflict`.
    fn map_unique_email(e: sqlx::Error) -> ApiError {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.constraint() == Some("users_email_key") {
                return ApiError::Conflict { resource: "email already registered".to_string() };
            }
        }
        ApiError::DatabaseError(e)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::domain::NewUser;

    // Query execution requires a live database; covered by the integration
    // environment. The struct plumbing is cheap to pin down here.

    #[test]
    fn test_new_user_defaults_unverified() {
        let new_user = NewUser {
            email: "test@example.com".to_string(),
            password_hash: "$2b$12$hash".to_string(),
            role: "USER".to_string(),
            email_verified: false,
        };

        assert_eq!(new_user.email, "test@example.com");
        assert!(!new_user.email_verified);
    }
}
