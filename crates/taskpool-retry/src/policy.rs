//! Policy configuration, classification, and backoff computation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use taskpool_core::Jitter;

/// Markers treated as transient when no custom set is configured.
pub const DEFAULT_RETRYABLE_SUBSTRINGS: &[&str] =
    &["timeout", "connection", "temporary", "rate limit", "429"];

/// Snapshot of retry behavior taken at task submission time.
///
/// The policy is immutable once built; reconfiguring the scheduler default
/// does not affect tasks already submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
    jitter_factor: f64,
    retryable_substrings: Vec<String>,
}

impl RetryPolicy {
    /// Creates a builder seeded with the defaults.
    ///
    /// Defaults: 3 retries, 200ms base delay, 10s max delay, factor 2.0,
    /// jitter 0.25, [`DEFAULT_RETRYABLE_SUBSTRINGS`].
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// A policy that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self::builder().max_retries(0).build()
    }

    /// Classifies an error message.
    ///
    /// Retryable iff the lowercased message contains any configured
    /// substring. An empty message is never retryable.
    #[must_use]
    pub fn is_retryable(&self, message: &str) -> bool {
        if message.is_empty() {
            return false;
        }
        let lowered = message.to_lowercase();
        let retryable = self
            .retryable_substrings
            .iter()
            .any(|needle| lowered.contains(needle.as_str()));

        #[cfg(feature = "tracing")]
        tracing::debug!(retryable, message, "classified failure");

        retryable
    }

    /// Computes the backoff before the `attempt`-th retry (1-indexed).
    ///
    /// `base_delay * backoff_factor^(attempt-1)`, clamped to `max_delay`,
    /// then offset by `delay * jitter_factor * sample` with `sample` drawn
    /// uniformly from `[-1, +1]`. The result is never below `base_delay`.
    #[must_use]
    pub fn delay(&self, attempt: u32, jitter: &dyn Jitter) -> Duration {
        let attempt = attempt.max(1);
        let exp = self.backoff_factor.powi(attempt as i32 - 1);
        let mut millis = self.base_delay.as_secs_f64() * 1000.0 * exp;
        millis = millis.min(self.max_delay.as_secs_f64() * 1000.0);

        if self.jitter_factor > 0.0 {
            millis += millis * self.jitter_factor * jitter.sample();
        }

        let floor = self.base_delay.as_secs_f64() * 1000.0;
        Duration::from_secs_f64(millis.max(floor) / 1000.0)
    }

    /// Maximum number of retry attempts after the initial one.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    #[must_use]
    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    #[must_use]
    pub fn jitter_factor(&self) -> f64 {
        self.jitter_factor
    }

    /// The configured transient markers, lowercased.
    #[must_use]
    pub fn retryable_substrings(&self) -> &[String] {
        &self.retryable_substrings
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
    jitter_factor: f64,
    retryable_substrings: Vec<String>,
}

impl RetryPolicyBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            jitter_factor: 0.25,
            retryable_substrings: DEFAULT_RETRYABLE_SUBSTRINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Sets the maximum number of retries after the initial attempt.
    ///
    /// `0` disables retries. Default: 3
    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Sets the first backoff delay. Must be positive; zero is bumped to
    /// one millisecond at build time. Default: 200ms
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the backoff ceiling. Raised to `base_delay` at build time when
    /// configured lower. Default: 10s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the exponential growth factor, floored at 1.0. Default: 2.0
    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Sets the jitter fraction, clamped to `[0, 1]`. Default: 0.25
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    /// Replaces the transient markers. Matching is case-insensitive.
    pub fn retryable_substrings<I, S>(mut self, substrings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retryable_substrings = substrings
            .into_iter()
            .map(|s| s.into().to_lowercase())
            .collect();
        self
    }

    /// Adds one transient marker to the existing set.
    pub fn retry_on(mut self, substring: impl Into<String>) -> Self {
        self.retryable_substrings.push(substring.into().to_lowercase());
        self
    }

    /// Builds the policy, normalizing out-of-range settings.
    pub fn build(self) -> RetryPolicy {
        let base_delay = if self.base_delay.is_zero() {
            Duration::from_millis(1)
        } else {
            self.base_delay
        };
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay,
            max_delay: self.max_delay.max(base_delay),
            backoff_factor: self.backoff_factor.max(1.0),
            jitter_factor: self.jitter_factor.clamp(0.0, 1.0),
            retryable_substrings: self.retryable_substrings,
        }
    }
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
