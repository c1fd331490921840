//! Retry policies.
//!
//! Two independent layers:
//!
//! 1. [`RetryConfig`]: transport-level retries inside [`ReqwestTransport`]
//!    for 5xx gateway failures and connect/timeout errors.
//! 2. [`BACKOFF_SCHEDULE`]: the executor's fixed schedule for business
//!    errors reported inside an otherwise successful JSON response.
//!
//! [`ReqwestTransport`]: crate::api::transport::ReqwestTransport

use std::time::Duration;

/// Attempts made by the executor before giving up on a business error.
pub const MAX_API_ATTEMPTS: u32 = 4;

/// Seconds to sleep after each failed attempt. The last slot is unused by
/// the current attempt count and kept as part of the policy.
pub const BACKOFF_SCHEDULE: [u64; MAX_API_ATTEMPTS as usize] = [0, 2, 4, 0];

/// Sleep after the given failed attempt (0-indexed).
pub fn backoff_for_attempt(attempt: u32) -> Duration {
    let secs = BACKOFF_SCHEDULE
        .get(attempt as usize)
        .copied()
        .unwrap_or(0);
    Duration::from_secs(secs)
}

/// Transport-level retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = disabled)
    pub max_retries: u32,
    /// Exponential backoff factor in milliseconds
    pub backoff_factor_ms: u64,
    /// HTTP status codes that trigger a retry
    pub retryable_statuses: Vec<u16>,
    /// Whether to add up to 25% jitter to each delay
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor_ms: 300,
            retryable_statuses: vec![500, 502, 503, 504],
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the given max retries.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// No transport-level retries.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    /// Set the backoff factor in milliseconds.
    pub fn with_backoff_factor_ms(mut self, ms: u64) -> Self {
        self.backoff_factor_ms = ms;
        self
    }

    /// Enable jitter.
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Delay for a given retry (0-indexed): `factor * 2^attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .backoff_factor_ms
            .saturating_mul(1 << attempt.min(10));
        if !self.jitter {
            return Duration::from_millis(delay);
        }
        // 75-100% of the calculated delay
        let jitter_range = delay / 4;
        let jitter = rand::random::<u64>() % (jitter_range + 1);
        Duration::from_millis(delay - jitter_range + jitter)
    }
}
