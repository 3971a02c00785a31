//! # Audit Log Repository
//!
//! Append-only data access for the `audit_logs` table, plus the admin
//! filter query, the anonymization scrub, and the retention sweep.
//!
//! Rows are appended either on the pool (standalone) or on a caller-owned
//! transaction so a state transition and its audit row commit together.

use shared::errors::ApiError;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::{AuditLogEntry, AuditLogFilter, NewAuditLog};

/// Repository for audit rows.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl AuditLogRepository {
    /// Creates a new repository instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // APPEND
    // =========================================================================

    /// Appends a row on the pool.
    pub async fn append(&self, log: NewAuditLog) -> Result<(), ApiError> {
        self.insert(&self.pool, log).await
    }

    /// Appends a row inside a caller-owned transaction.
    pub async fn append_tx(
        &self,
        conn: &mut PgConnection,
        log: NewAuditLog,
    ) -> Result<(), ApiError> {
        self.insert(conn, log).await
    }

    /// Shared insert over any executor.
    async fn insert<'e, E>(&self, executor: E, log: NewAuditLog) -> Result<(), ApiError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                user_id, performed_by, action, resource, ip_address,
                user_agent, metadata, success, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(log.user_id)
        .bind(log.performed_by)
        .bind(log.action.as_str())
        .bind(&log.resource)
        .bind(&log.ip_address)
        .bind(&log.user_agent)
        .bind(&log.metadata)
        .bind(log.success)
        .bind(&log.error_message)
        .execute(executor)
        .await?;

        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Admin filter query with offset pagination.
    ///
    /// Returns the matching page (newest first) and the total match count.
    pub async fn query(
        &self,
        filter: &AuditLogFilter,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<AuditLogEntry>, i64), ApiError> {
        let offset = (page.saturating_sub(1) as i64) * limit as i64;
        let action = filter.action.map(|a| a.as_str());

        let logs = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT * FROM audit_logs
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR action = $2)
              AND ($3::bool IS NULL OR success = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            ORDER BY created_at DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(filter.user_id)
        .bind(action)
        .bind(filter.success)
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM audit_logs
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR action = $2)
              AND ($3::bool IS NULL OR success = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            "#,
        )
        .bind(filter.user_id)
        .bind(action)
        .bind(filter.success)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await?;

        Ok((logs, total.0))
    }

    /// Lists a user's own recent rows (`GET /auth/audit/me`).
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<AuditLogEntry>, ApiError> {
        let logs = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT * FROM audit_logs
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    // =========================================================================
    // GDPR / RETENTION
    // =========================================================================

    /// Scrubs a user's audit rows for anonymization.
    ///
    /// `user_id` is preserved for aggregation; the request-context columns
    /// are replaced with the sentinel and metadata collapses to a marker.
    pub async fn anonymize_for_user(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<u64, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE audit_logs
            SET resource = 'anonymized',
                ip_address = 'anonymized',
                user_agent = 'anonymized',
                metadata = '{"anonymized": true}'::jsonb
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes rows older than the retention window. Returns the count.
    pub async fn sweep_older_than_days(&self, days: u32) -> Result<u64, ApiError> {
        let result = sqlx::query(
            "DELETE FROM audit_logs WHERE created_at < NOW() - make_interval(days => $1)",
        )
        .bind(days as i32)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
