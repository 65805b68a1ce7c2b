// ============================
// aidlink-login-guard/src/limiter.rs
// ============================
//! Failed-login tracking and rate limiting per account identifier.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::{counter, gauge};

use crate::clock::{Clock, SystemClock};
use crate::config::LimiterSettings;
use crate::metrics::{
    FAILURES_RECORDED, LOCKOUTS_TRIGGERED, RECORDS_SWEPT, TRACKED_IDENTIFIERS,
};

/// Entry in the attempt-tracking map
#[derive(Debug, Clone)]
struct AttemptRecord {
    /// Failures observed inside the current window
    failures: u32,
    /// When the current counting window began
    window_start: Instant,
}

/// Rate limiter for login attempts, keyed by normalized account email.
///
/// Counts consecutive failures inside a fixed window. Once the count
/// reaches the threshold, the identifier stays limited until the window
/// expires or the attempt history is cleared after a successful login.
/// Cloning yields a handle onto the same attempt table.
#[derive(Debug, Clone)]
pub struct LoginAttemptLimiter {
    /// Map of identifiers to attempt records
    records: Arc<DashMap<String, AttemptRecord>>,
    /// Failures needed before an identifier is limited
    max_failures: u32,
    /// Length of the counting window
    window: Duration,
    /// How long past expiry a record may linger before the sweep drops it
    sweep_grace: Duration,
    /// Time source; swapped out in tests
    clock: Arc<dyn Clock>,
}

impl Default for LoginAttemptLimiter {
    fn default() -> Self {
        Self::new(&LimiterSettings::default())
    }
}

impl LoginAttemptLimiter {
    /// Create a limiter reading the monotonic system clock
    pub fn new(settings: &LimiterSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// Create a limiter with an explicit time source
    pub fn with_clock(settings: &LimiterSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            max_failures: settings.max_failures,
            window: settings.window(),
            sweep_grace: settings.sweep_grace(),
            clock,
        }
    }

    /// Check whether an identifier is currently blocked from logging in.
    ///
    /// Pure read: an absent record, an expired window, or a count below
    /// the threshold all mean "not limited". Stale records are left for
    /// the sweep.
    pub fn is_rate_limited(&self, identifier: &str) -> bool {
        let now = self.clock.now();

        match self.records.get(identifier) {
            Some(record) => {
                now.duration_since(record.window_start) < self.window
                    && record.failures >= self.max_failures
            }
            None => false,
        }
    }

    /// Record a failed login attempt.
    ///
    /// Starts a fresh window when no live record exists, otherwise
    /// increments the current one. Returns true iff the identifier is
    /// rate-limited after this update.
    pub fn record_failed_login(&self, identifier: &str) -> bool {
        let now = self.clock.now();

        let mut entry = self
            .records
            .entry(identifier.to_string())
            .or_insert_with(|| AttemptRecord {
                failures: 0,
                window_start: now,
            });

        // A record left over from an expired window counts as absent
        if now.duration_since(entry.window_start) >= self.window {
            entry.failures = 0;
            entry.window_start = now;
        }

        entry.failures = entry.failures.saturating_add(1);
        let failures = entry.failures;
        // Drop the shard guard before len(), which locks every shard
        drop(entry);

        counter!(FAILURES_RECORDED).increment(1);
        gauge!(TRACKED_IDENTIFIERS).set(self.records.len() as f64);

        if failures == self.max_failures {
            counter!(LOCKOUTS_TRIGGERED).increment(1);
            tracing::warn!(
                "Rate limiting login attempts for {identifier} after {failures} failures"
            );
        }

        failures >= self.max_failures
    }

    /// Forget the attempt history for an identifier.
    ///
    /// Called after a verified-successful login. Idempotent.
    pub fn clear_failed_logins(&self, identifier: &str) {
        if self.records.remove(identifier).is_some() {
            tracing::debug!("Cleared failed-login history for {identifier}");
        }
    }

    /// Drop records whose window expired longer than the grace period ago.
    ///
    /// Memory-bound cleanup only; `is_rate_limited` never depends on it.
    /// Returns the number of records removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let stale_after = self.window + self.sweep_grace;

        let before = self.records.len();
        self.records
            .retain(|_, record| now.duration_since(record.window_start) < stale_after);

        // Concurrent inserts can land mid-retain; the count is best-effort
        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            counter!(RECORDS_SWEPT).increment(removed as u64);
            tracing::debug!("Swept {removed} stale login-attempt records");
        }
        gauge!(TRACKED_IDENTIFIERS).set(self.records.len() as f64);

        removed
    }

    /// Number of identifiers currently tracked
    pub fn tracked(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn settings() -> LimiterSettings {
        LimiterSettings::default()
    }

    fn limiter_with_manual_clock() -> (LoginAttemptLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let limiter = LoginAttemptLimiter::with_clock(&settings(), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_unknown_identifier_not_limited() {
        let limiter = LoginAttemptLimiter::new(&settings());
        assert!(!limiter.is_rate_limited("nobody@example.org"));
    }

    #[test]
    fn test_threshold_crossed_on_fifth_failure() {
        let limiter = LoginAttemptLimiter::new(&settings());

        for _ in 0..4 {
            assert!(!limiter.record_failed_login("a@x.com"));
        }
        assert!(!limiter.is_rate_limited("a@x.com"));

        assert!(limiter.record_failed_login("a@x.com"));
        assert!(limiter.is_rate_limited("a@x.com"));
    }

    #[test]
    fn test_failures_past_threshold_stay_limited() {
        let limiter = LoginAttemptLimiter::new(&settings());

        for _ in 0..5 {
            limiter.record_failed_login("a@x.com");
        }
        assert!(limiter.record_failed_login("a@x.com"));
        assert!(limiter.is_rate_limited("a@x.com"));
    }

    #[test]
    fn test_clear_resets_attempt_history() {
        let limiter = LoginAttemptLimiter::new(&settings());

        for _ in 0..5 {
            limiter.record_failed_login("a@x.com");
        }
        assert!(limiter.is_rate_limited("a@x.com"));

        limiter.clear_failed_logins("a@x.com");
        assert!(!limiter.is_rate_limited("a@x.com"));
        assert_eq!(limiter.tracked(), 0);

        // A fresh run of failures is needed to limit again
        for _ in 0..4 {
            assert!(!limiter.record_failed_login("a@x.com"));
        }
        assert!(limiter.record_failed_login("a@x.com"));
    }

    #[test]
    fn test_clear_without_history_is_noop() {
        let limiter = LoginAttemptLimiter::new(&settings());
        limiter.clear_failed_logins("a@x.com");
        assert!(!limiter.is_rate_limited("a@x.com"));
    }

    #[test]
    fn test_identifiers_tracked_independently() {
        let limiter = LoginAttemptLimiter::new(&settings());

        for _ in 0..5 {
            limiter.record_failed_login("a@x.com");
        }
        assert!(limiter.is_rate_limited("a@x.com"));
        assert!(!limiter.is_rate_limited("b@x.com"));
    }

    #[test]
    fn test_window_expiry_unlimits_without_clear() {
        let (limiter, clock) = limiter_with_manual_clock();

        for _ in 0..5 {
            limiter.record_failed_login("a@x.com");
        }
        assert!(limiter.is_rate_limited("a@x.com"));

        clock.advance(settings().window());
        assert!(!limiter.is_rate_limited("a@x.com"));
    }

    #[test]
    fn test_failure_after_expiry_starts_fresh_window() {
        let (limiter, clock) = limiter_with_manual_clock();

        for _ in 0..5 {
            limiter.record_failed_login("a@x.com");
        }
        clock.advance(settings().window());

        // First failure of the new window, count restarts at one
        assert!(!limiter.record_failed_login("a@x.com"));
        assert!(!limiter.is_rate_limited("a@x.com"));

        for _ in 0..3 {
            assert!(!limiter.record_failed_login("a@x.com"));
        }
        assert!(limiter.record_failed_login("a@x.com"));
        assert!(limiter.is_rate_limited("a@x.com"));
    }

    #[test]
    fn test_stale_read_does_not_evict() {
        let (limiter, clock) = limiter_with_manual_clock();

        limiter.record_failed_login("a@x.com");
        clock.advance(settings().window());

        assert!(!limiter.is_rate_limited("a@x.com"));
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn test_sweep_drops_stale_keeps_live() {
        let (limiter, clock) = limiter_with_manual_clock();

        limiter.record_failed_login("stale@x.com");
        clock.advance(settings().window() + settings().sweep_grace());
        limiter.record_failed_login("fresh@x.com");

        assert_eq!(limiter.sweep_expired(), 1);
        assert_eq!(limiter.tracked(), 1);
        assert!(!limiter.is_rate_limited("stale@x.com"));
    }

    #[test]
    fn test_sweep_spares_grace_period() {
        let (limiter, clock) = limiter_with_manual_clock();

        limiter.record_failed_login("a@x.com");
        clock.advance(settings().window());

        assert_eq!(limiter.sweep_expired(), 0);
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn test_sweep_empty_table() {
        let limiter = LoginAttemptLimiter::new(&settings());
        assert_eq!(limiter.sweep_expired(), 0);
        assert_eq!(limiter.tracked(), 0);
    }
}
