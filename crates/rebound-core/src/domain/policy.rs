//! Retry policy: decides how many attempts and how long to wait between them.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use super::errors::PolicyError;
use super::kind::RetryOn;

/// Retries after the first call when nothing else is configured.
pub const DEFAULT_TOTAL_TRIES: u32 = 4;

/// The first call plus `DEFAULT_TOTAL_TRIES` retries.
pub const DEFAULT_MAX_ATTEMPTS: u32 = DEFAULT_TOTAL_TRIES + 1;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);

pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Retry policy for a wrapped operation.
///
/// Immutable once built. Use [`RetryPolicy::builder`] so that invalid
/// combinations are rejected up front.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy<K: Eq + Hash> {
    retry_on: RetryOn<K>,
    max_attempts: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
}

impl<K: Copy + Eq + Hash + Debug> RetryPolicy<K> {
    pub fn builder(retry_on: RetryOn<K>) -> RetryPolicyBuilder<K> {
        RetryPolicyBuilder::new(retry_on)
    }

    pub fn retry_on(&self) -> &RetryOn<K> {
        &self.retry_on
    }

    /// Total invocations allowed, the first call included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    pub fn is_retryable(&self, kind: &K) -> bool {
        self.retry_on.matches(kind)
    }

    /// Delay to wait before `attempt` (1-indexed).
    ///
    /// delay = initial_delay * backoff_multiplier^(attempt - 2)
    ///
    /// Example with initial_delay=1s, backoff_multiplier=2.0:
    /// - attempt 1: 0s (the first call never waits)
    /// - attempt 2: 1s
    /// - attempt 3: 2s
    /// - attempt 4: 4s
    ///
    /// A multiplier below 1.0 shrinks the delay on every retry with no floor.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 || self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl<K: Copy + Eq + Hash + Debug> Default for RetryPolicy<K> {
    fn default() -> Self {
        Self {
            retry_on: RetryOn::Any,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

/// RetryPolicyBuilder は RetryPolicy を構築
///
/// # Fail-fast 設計
/// - build() 時に値の組み合わせを検証
/// - 不正なら PolicyError を返す（実行時まで持ち越さない）
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder<K: Eq + Hash> {
    retry_on: RetryOn<K>,
    max_attempts: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
}

impl<K: Copy + Eq + Hash + Debug> RetryPolicyBuilder<K> {
    pub fn new(retry_on: RetryOn<K>) -> Self {
        Self {
            retry_on,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Total invocations, the first call included.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Number of retries after the first call (`max_attempts = total_tries + 1`).
    pub fn total_tries(mut self, total_tries: u32) -> Self {
        self.max_attempts = total_tries.saturating_add(1);
        self
    }

    pub fn initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    pub fn build(self) -> Result<RetryPolicy<K>, PolicyError> {
        if self.max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if self.retry_on.is_empty() {
            return Err(PolicyError::EmptyFilter);
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 0.0 {
            return Err(PolicyError::InvalidMultiplier(self.backoff_multiplier));
        }
        Ok(RetryPolicy {
            retry_on: self.retry_on,
            max_attempts: self.max_attempts,
            initial_delay: self.initial_delay,
            backoff_multiplier: self.backoff_multiplier,
        })
    }
}
