//! # Audit Recorder
//!
//! The single write path for the audit trail, plus the admin query surface
//! and retention sweep.
//!
//! ## Failure Semantics
//!
//! By the time an audit row is appended, the domain action has already
//! happened - so a failed write is logged at WARN and swallowed, never
//! propagated. Callers decide whether the row joins the enclosing
//! transaction ([`AuditRecorder::record_tx`]) or lands independently
//! ([`AuditRecorder::record`]).

use shared::errors::ApiError;
use sqlx::PgConnection;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{AuditLogEntry, AuditLogFilter, AuditLogPage, NewAuditLog};
use crate::repository::AuditLogRepository;

/// Default page size for the admin query.
const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Hard ceiling on the admin query page size.
const MAX_PAGE_LIMIT: u32 = 100;

/// Rows returned by the self-service `GET /auth/audit/me` view.
const SELF_VIEW_LIMIT: u32 = 50;

/// Append-only recorder over the audit repository.
#[derive(Clone)]
pub struct AuditRecorder {
    repository: AuditLogRepository,
}

impl AuditRecorder {
    /// Creates a new recorder.
    pub fn new(repository: AuditLogRepository) -> Self {
        Self { repository }
    }

    // =========================================================================
    // APPEND
    // =========================================================================

    /// Appends a row on the pool. Never fails the caller.
    pub async fn record(&self, log: NewAuditLog) {
        let action = log.action;
        if let Err(e) = self.repository.append(log).await {
            warn!(action = %action, error = %e, "Failed to append audit log");
        }
    }

    /// Appends a row inside the caller's transaction. Never fails the caller.
    ///
    /// Successful state transitions use this so the audit row commits with
    /// the transition itself (one row per transition, same transaction).
    pub async fn record_tx(&self, conn: &mut PgConnection, log: NewAuditLog) {
        let action = log.action;
        if let Err(e) = self.repository.append_tx(conn, log).await {
            warn!(action = %action, error = %e, "Failed to append audit log");
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Admin filter query with offset pagination.
    pub async fn query(
        &self,
        filter: AuditLogFilter,
        page: u32,
        limit: u32,
    ) -> Result<AuditLogPage, ApiError> {
        let page = page.max(1);
        let limit = match limit {
            0 => DEFAULT_PAGE_LIMIT,
            n => n.min(MAX_PAGE_LIMIT),
        };

        let (logs, total) = self.repository.query(&filter, page, limit).await?;

        Ok(AuditLogPage {
            logs,
            page,
            limit,
            total,
            total_pages: AuditLogPage::pages_for(total, limit),
        })
    }

    /// A user's own recent activity.
    pub async fn recent_for_user(&self, user_id: Uuid) -> Result<Vec<AuditLogEntry>, ApiError> {
        self.repository.list_for_user(user_id, SELF_VIEW_LIMIT).await
    }

    // =========================================================================
    // RETENTION
    // =========================================================================

    /// Deletes rows older than the retention window. Returns the count.
    pub async fn sweep(&self, retention_days: u32) -> Result<u64, ApiError> {
        self.repository.sweep_older_than_days(retention_days).await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limits() {
        // The clamping rules the query applies
        assert_eq!(DEFAULT_PAGE_LIMIT, 20);
        assert_eq!(MAX_PAGE_LIMIT, 100);
        assert!(SELF_VIEW_LIMIT <= MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_total_pages_roundup() {
        assert_eq!(AuditLogPage::pages_for(41, DEFAULT_PAGE_LIMIT), 3);
    }
}
