//! # Background Sweeper
//!
//! Hourly cleanup of expired verification and reset tokens. Expiry
//! rejections already delete rows they touch; this catches the tokens
//! nobody ever presented.

use std::time::Duration;
use tracing::{info, warn};

use crate::repository::{PasswordResetTokenRepository, VerificationTokenRepository};

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Spawns the token sweeper. Runs until the process exits.
pub fn spawn_token_sweeper(
    verification_tokens: VerificationTokenRepository,
    reset_tokens: PasswordResetTokenRepository,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);

        loop {
            interval.tick().await;

            match verification_tokens.sweep_expired().await {
                Ok(n) if n > 0 => info!(count = n, "Swept expired verification tokens"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Verification token sweep failed"),
            }

            match reset_tokens.sweep_expired().await {
                Ok(n) if n > 0 => info!(count = n, "Swept expired reset tokens"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Reset token sweep failed"),
            }
        }
    });
}
