//! Retry policy: exponential backoff with a cap.
//!
//! A [`RetryPolicy`] is pure configuration — it computes delays and answers
//! membership questions but performs no sleeping itself. The extraction
//! engine owns the actual `tokio::time::sleep` calls. Keeping the policy
//! side-effect free makes the backoff curve trivially testable and lets one
//! read-only instance be shared across every concurrent job.
//!
//! Exponential backoff avoids the thundering-herd problem where N concurrent
//! workers retry simultaneously and immediately overwhelm the recognition
//! runtime that is still recovering.

use crate::error::FailureKind;
use std::collections::HashSet;
use std::time::Duration;

/// Backoff and retryability configuration, shared read-only across jobs.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure. Default: 3.
    pub max_retries: u32,
    /// Delay before the first retry. Default: 2s.
    pub initial_delay: Duration,
    /// Upper bound on any single delay. Default: 60s.
    pub max_delay: Duration,
    /// Multiplier applied per attempt. Default: 2.0.
    pub backoff_factor: f64,
    /// Failure kinds that trigger a retry; everything else fails immediately.
    pub retry_on: HashSet<FailureKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            // All transient kinds. ModelUnavailable, ImageMissing and
            // ValidationError are resolved without retrying (substitution,
            // page-level error, block drop respectively).
            retry_on: HashSet::from([
                FailureKind::ProcessTimeout,
                FailureKind::ProcessFailure,
                FailureKind::MalformedOutput,
            ]),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    ///
    /// `min(initial_delay * backoff_factor^(attempt-1), max_delay)`.
    /// Monotonically non-decreasing in `attempt` and capped by `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let delay = self.initial_delay.as_secs_f64() * exp;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Whether a failure of this kind should be retried.
    pub fn is_retryable(&self, kind: FailureKind) -> bool {
        self.retry_on.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_until_cap() {
        let policy = RetryPolicy::default();
        let secs: Vec<u64> = (1..=6).map(|a| policy.delay_for(a).as_secs()).collect();
        assert_eq!(secs, vec![2, 4, 8, 16, 32, 60]);
    }

    #[test]
    fn delay_is_monotonically_non_decreasing() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(500),
            backoff_factor: 1.7,
            max_delay: Duration::from_secs(10),
            ..RetryPolicy::default()
        };
        let mut prev = Duration::ZERO;
        for attempt in 1..=20 {
            let d = policy.delay_for(attempt);
            assert!(d >= prev, "attempt {attempt}: {d:?} < {prev:?}");
            assert!(d <= policy.max_delay);
            prev = d;
        }
    }

    #[test]
    fn attempt_zero_clamps_to_initial() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), policy.delay_for(1));
    }

    #[test]
    fn default_retryable_set() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(FailureKind::ProcessTimeout));
        assert!(policy.is_retryable(FailureKind::ProcessFailure));
        assert!(policy.is_retryable(FailureKind::MalformedOutput));
        assert!(!policy.is_retryable(FailureKind::ModelUnavailable));
        assert!(!policy.is_retryable(FailureKind::ImageMissing));
        assert!(!policy.is_retryable(FailureKind::ValidationError));
    }

    #[test]
    fn tightened_policy_stops_retrying_malformed() {
        let mut policy = RetryPolicy::default();
        policy.retry_on.remove(&FailureKind::MalformedOutput);
        assert!(!policy.is_retryable(FailureKind::MalformedOutput));
        assert!(policy.is_retryable(FailureKind::ProcessTimeout));
    }
}
