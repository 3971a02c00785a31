//! # Background Sweeper
//!
//! Periodic cleanup of expired credentials and aged audit rows. The
//! sweepers repair whatever an interrupted request left behind: an expired
//! refresh token that never got rotated, a session past its expiry, a
//! magic link nobody redeemed.
//!
//! | Task | Interval | Deletes |
//! |------|----------|---------|
//! | Token sweep | hourly | expired refresh tokens, expired sessions (deactivate), expired + stale-used magic links |
//! | Audit retention | daily | audit rows older than the configured window |

use std::time::Duration;
use tracing::{info, warn};

use crate::repository::{MagicLinkRepository, RefreshTokenRepository, SessionRepository};
use crate::service::AuditRecorder;

/// How often the token sweep runs.
const TOKEN_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// How often the audit retention sweep runs.
const AUDIT_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Spawns the token sweeper. Runs until the process exits.
pub fn spawn_token_sweeper(
    refresh_tokens: RefreshTokenRepository,
    sessions: SessionRepository,
    magic_links: MagicLinkRepository,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TOKEN_SWEEP_INTERVAL);

        loop {
            interval.tick().await;

            match refresh_tokens.sweep_expired().await {
                Ok(n) if n > 0 => info!(count = n, "Swept expired refresh tokens"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Refresh token sweep failed"),
            }

            match sessions.sweep_expired().await {
                Ok(n) if n > 0 => info!(count = n, "Deactivated expired sessions"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Session sweep failed"),
            }

            match magic_links.sweep().await {
                Ok(n) if n > 0 => info!(count = n, "Swept magic link tokens"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Magic link sweep failed"),
            }
        }
    });
}

/// Spawns the audit retention sweeper. Runs until the process exits.
pub fn spawn_audit_sweeper(audit: AuditRecorder, retention_days: u32) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(AUDIT_SWEEP_INTERVAL);

        loop {
            interval.tick().await;

            match audit.sweep(retention_days).await {
                Ok(n) if n > 0 => info!(count = n, retention_days, "Swept aged audit rows"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Audit retention sweep failed"),
            }
        }
    });
}
