//! # Lockout Policy
//!
//! Pure functions over the user's `failed_login_attempts` and
//! `account_locked_until` columns. The policy itself has no I/O; the login
//! transaction applies these transitions while holding a row lock on the
//! user, so two concurrent failures can never both slip past the threshold
//! without locking.
//!
//! ## State Machine
//!
//! ```text
//!                 wrong password            attempts == 5
//!   ┌──────────┐ ───────────────► ┌───────┐ ─────────────► ┌─────────┐
//!   │ unlocked │                  │ count │                │ locked  │
//!   │ (n = 0)  │ ◄─────────────── │ n < 5 │                │ 30 min  │
//!   └──────────┘  correct passwd  └───────┘                └────┬────┘
//!        ▲                                                      │
//!        └──────────────────────────────────────────────────────┘
//!                     lock expiry (next login attempt)
//! ```

use chrono::{DateTime, Duration, Utc};

/// Failed attempts that trigger a lock.
pub const MAX_FAILED_ATTEMPTS: i32 = 5;

/// How long a triggered lock lasts.
pub const LOCK_DURATION_MINUTES: i64 = 30;

/// The outcome of recording one failed password attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttempt {
    /// The counter value after this failure.
    pub attempts: i32,
    /// Set when this failure crossed the threshold.
    pub locked_until: Option<LockedUntil>,
}

/// Newtype so the lock instant can't be confused with other timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedUntil(pub DateTime<Utc>);

/// Applies one failed attempt to the current counter.
///
/// Returns the new counter and, when the threshold is reached, the lock
/// release instant (`now + 30 min`).
pub fn register_failure(current_attempts: i32, now: DateTime<Utc>) -> FailedAttempt {
    let attempts = current_attempts.saturating_add(1);

    let locked_until = if attempts >= MAX_FAILED_ATTEMPTS {
        Some(LockedUntil(now + Duration::minutes(LOCK_DURATION_MINUTES)))
    } else {
        None
    };

    FailedAttempt { attempts, locked_until }
}

/// Returns whether a stored lock is still in force at `now`.
pub fn is_locked(locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(locked_until, Some(until) if until > now)
}

/// Returns whether a stored lock exists but has expired at `now`.
///
/// An expired lock is cleared (and the counter reset) by the next login
/// attempt that observes it.
pub fn is_expired_lock(locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(locked_until, Some(until) if until <= now)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_below_threshold_do_not_lock() {
        let now = Utc::now();

        for current in 0..MAX_FAILED_ATTEMPTS - 1 {
            let outcome = register_failure(current, now);
            assert_eq!(outcome.attempts, current + 1);
            assert!(outcome.locked_until.is_none(), "locked at {}", current + 1);
        }
    }

    #[test]
    fn test_fifth_failure_locks_for_thirty_minutes() {
        let now = Utc::now();
        let outcome = register_failure(MAX_FAILED_ATTEMPTS - 1, now);

        assert_eq!(outcome.attempts, MAX_FAILED_ATTEMPTS);
        let LockedUntil(until) = outcome.locked_until.expect("threshold must lock");
        assert_eq!(until, now + Duration::minutes(LOCK_DURATION_MINUTES));
    }

    #[test]
    fn test_failures_past_threshold_still_lock() {
        // A racing attempt that observed a stale counter must also lock.
        let now = Utc::now();
        let outcome = register_failure(7, now);

        assert_eq!(outcome.attempts, 8);
        assert!(outcome.locked_until.is_some());
    }

    #[test]
    fn test_is_locked() {
        let now = Utc::now();

        assert!(!is_locked(None, now));
        assert!(!is_locked(Some(now - Duration::seconds(1)), now));
        assert!(is_locked(Some(now + Duration::minutes(5)), now));
    }

    #[test]
    fn test_expired_lock_detection() {
        let now = Utc::now();

        assert!(!is_expired_lock(None, now));
        assert!(is_expired_lock(Some(now - Duration::seconds(1)), now));
        assert!(is_expired_lock(Some(now), now));
        assert!(!is_expired_lock(Some(now + Duration::minutes(5)), now));
    }

    #[test]
    fn test_counter_saturates() {
        let outcome = register_failure(i32::MAX, Utc::now());
        assert_eq!(outcome.attempts, i32::MAX);
        assert!(outcome.locked_until.is_some());
    }
}
