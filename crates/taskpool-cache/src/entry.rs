//! Cache row model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token, cost, and timing metrics carried with a cached outcome.
///
/// The cache stores and returns these as-is; it never interprets them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
    pub duration_ms: u64,
}

/// One row in the result cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// 64-hex SHA-256 over the request inputs. Opaque to the cache.
    pub fingerprint: String,
    /// Cached payload.
    pub response: String,
    /// Nonempty iff the cached outcome was a failure.
    pub error: Option<String>,
    pub metrics: CacheMetrics,
    /// Display/aggregation metadata.
    pub model: Option<String>,
    pub project: Option<String>,
    pub task_label: Option<String>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    /// `None` means the row never expires (store TTL still applies at
    /// write time when configured).
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// A successful outcome for `fingerprint`.
    #[must_use]
    pub fn success(fingerprint: &str, response: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            fingerprint: fingerprint.to_string(),
            response: response.into(),
            error: None,
            metrics: CacheMetrics::default(),
            model: None,
            project: None,
            task_label: None,
            session_id: None,
            created_at: now,
            accessed_at: now,
            expires_at: None,
        }
    }

    /// A failed outcome for `fingerprint`.
    #[must_use]
    pub fn failure(fingerprint: &str, error: impl Into<String>) -> Self {
        let mut entry = Self::success(fingerprint, "");
        entry.error = Some(error.into());
        entry
    }

    pub fn with_metrics(mut self, metrics: CacheMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_task_label(mut self, label: impl Into<String>) -> Self {
        self.task_label = Some(label.into());
        self
    }

    pub fn with_session_id(mut self, session: impl Into<String>) -> Self {
        self.session_id = Some(session.into());
        self
    }

    /// Returns `true` if the cached outcome was a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Returns `true` if the row is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}
