//! Retry policy for taskpool tasks.
//!
//! A [`RetryPolicy`] answers two questions for the scheduler:
//!
//! 1. **Is this failure worth retrying?** Classification is by substring:
//!    an error is retryable iff its lowercased message contains one of the
//!    configured markers (`"timeout"`, `"connection"`, `"temporary"`,
//!    `"rate limit"`, `"429"` by default).
//! 2. **How long until the next attempt?** Exponential backoff from
//!    `base_delay` by `backoff_factor`, clamped to `max_delay`, offset by
//!    uniform jitter, and never below `base_delay`.
//!
//! # Example
//!
//! ```
//! use taskpool_retry::RetryPolicy;
//! use taskpool_core::FixedJitter;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::builder()
//!     .max_retries(3)
//!     .base_delay(Duration::from_millis(50))
//!     .backoff_factor(2.0)
//!     .jitter_factor(0.0)
//!     .build();
//!
//! assert!(policy.is_retryable("dial tcp: connection refused"));
//! assert!(!policy.is_retryable("invalid argument"));
//! assert_eq!(policy.delay(1, &FixedJitter(0.0)), Duration::from_millis(50));
//! assert_eq!(policy.delay(2, &FixedJitter(0.0)), Duration::from_millis(100));
//! ```

mod policy;

pub use policy::{RetryPolicy, RetryPolicyBuilder, DEFAULT_RETRYABLE_SUBSTRINGS};
