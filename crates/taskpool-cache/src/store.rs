//! SQLite store: open, get/set, clear, reap, usage stats.

use crate::entry::{CacheEntry, CacheMetrics};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// How often the background reaper deletes expired rows.
pub const REAP_INTERVAL: Duration = Duration::from_secs(3600);

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS results (
    fingerprint TEXT PRIMARY KEY,
    response TEXT NOT NULL,
    error TEXT,
    model TEXT,
    project TEXT,
    task_label TEXT,
    session_id TEXT,
    prompt_tokens INTEGER NOT NULL DEFAULT 0,
    completion_tokens INTEGER NOT NULL DEFAULT 0,
    cost_usd REAL NOT NULL DEFAULT 0,
    duration_ms INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    accessed_at TEXT NOT NULL,
    expires_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_results_created ON results(created_at);
CREATE INDEX IF NOT EXISTS idx_results_project ON results(project);
CREATE INDEX IF NOT EXISTS idx_results_model ON results(model);

CREATE TABLE IF NOT EXISTS usage (
    day TEXT NOT NULL,
    model TEXT NOT NULL,
    project TEXT NOT NULL,
    hits INTEGER NOT NULL DEFAULT 0,
    misses INTEGER NOT NULL DEFAULT 0,
    prompt_tokens INTEGER NOT NULL DEFAULT 0,
    completion_tokens INTEGER NOT NULL DEFAULT 0,
    cost_usd REAL NOT NULL DEFAULT 0,
    PRIMARY KEY (day, model, project)
);
";

#[derive(Debug, Error)]
enum CacheError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("bad timestamp: {0}")]
    BadTimestamp(#[from] chrono::ParseError),
}

/// Scope filter for [`ResultCache::clear`].
#[derive(Debug, Clone)]
pub enum ClearScope {
    /// Remove every row.
    All,
    /// Remove rows belonging to one project label.
    Project(String),
    /// Remove rows created more than this long ago.
    OlderThan(Duration),
}

/// One row of the aggregate usage table.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRow {
    pub day: String,
    pub model: String,
    pub project: String,
    pub hits: u64,
    pub misses: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

struct StoreInner {
    conn: Mutex<Connection>,
    ttl: ChronoDuration,
}

/// Handle to the result cache. Cloning is cheap; all clones share one
/// connection serialized by the store's own locking.
///
/// A cache is *disabled* when the TTL is zero or the store could not be
/// opened. Disabled caches answer every `get` with a miss and ignore
/// every write; the scheduler never observes a cache failure.
#[derive(Clone)]
pub struct ResultCache {
    inner: Option<Arc<StoreInner>>,
}

impl ResultCache {
    /// Opens (or creates) the store at `path` with the given row TTL.
    ///
    /// Never fails: a zero TTL or any open error yields a disabled cache.
    #[must_use]
    pub fn open(path: &Path, ttl: Duration) -> Self {
        if ttl.is_zero() {
            return Self::disabled();
        }
        if let Some(parent) = path.parent() {
            if let Err(_err) = std::fs::create_dir_all(parent) {
                #[cfg(feature = "tracing")]
                tracing::debug!(path = %path.display(), error = %_err, "cache directory unavailable, caching disabled");
                return Self::disabled();
            }
        }
        match Connection::open(path).map_err(CacheError::from).and_then(Self::init_conn) {
            Ok(conn) => Self {
                inner: Some(Arc::new(StoreInner {
                    conn: Mutex::new(conn),
                    ttl: ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX),
                })),
            },
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(path = %path.display(), error = %_err, "cache store unavailable, caching disabled");
                Self::disabled()
            }
        }
    }

    /// Opens an in-memory store (tests).
    #[must_use]
    pub fn in_memory(ttl: Duration) -> Self {
        if ttl.is_zero() {
            return Self::disabled();
        }
        match Connection::open_in_memory().map_err(CacheError::from).and_then(Self::init_conn) {
            Ok(conn) => Self {
                inner: Some(Arc::new(StoreInner {
                    conn: Mutex::new(conn),
                    ttl: ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX),
                })),
            },
            Err(_) => Self::disabled(),
        }
    }

    /// A cache that stores nothing and always misses.
    #[must_use]
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    fn init_conn(conn: Connection) -> Result<Connection, CacheError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }

    /// Returns `true` when the store is usable.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    fn conn(inner: &StoreInner) -> MutexGuard<'_, Connection> {
        inner.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Looks up a fingerprint. Expired rows and store errors are misses.
    /// Hits advance `accessed_at`.
    #[must_use]
    pub fn get(&self, fingerprint: &str) -> Option<CacheEntry> {
        let inner = self.inner.as_ref()?;
        match Self::get_inner(inner, fingerprint) {
            Ok(hit) => hit,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(fingerprint, error = %_err, "cache read degraded to miss");
                None
            }
        }
    }

    fn get_inner(inner: &StoreInner, fingerprint: &str) -> Result<Option<CacheEntry>, CacheError> {
        let now = Utc::now();
        let conn = Self::conn(inner);
        let row = conn
            .query_row(
                "SELECT fingerprint, response, error, model, project, task_label, session_id,
                        prompt_tokens, completion_tokens, cost_usd, duration_ms,
                        created_at, accessed_at, expires_at
                 FROM results WHERE fingerprint = ?1",
                params![fingerprint],
                raw_row,
            )
            .optional()?;

        let Some(raw) = row else {
            Self::bump_usage(&conn, &now, "", "", false, None)?;
            return Ok(None);
        };

        let mut entry = raw.into_entry()?;
        if entry.is_expired_at(now) {
            Self::bump_usage(&conn, &now, "", "", false, None)?;
            return Ok(None);
        }

        conn.execute(
            "UPDATE results SET accessed_at = ?1 WHERE fingerprint = ?2",
            params![now.to_rfc3339(), fingerprint],
        )?;
        entry.accessed_at = now;

        Self::bump_usage(
            &conn,
            &now,
            entry.model.as_deref().unwrap_or(""),
            entry.project.as_deref().unwrap_or(""),
            true,
            None,
        )?;
        Ok(Some(entry))
    }

    /// Idempotent upsert. A second `set` for the same fingerprint replaces
    /// the prior row atomically. No-op when disabled; errors swallowed.
    pub fn set(&self, entry: &CacheEntry) {
        let Some(inner) = self.inner.as_ref() else {
            return;
        };
        if let Err(_err) = Self::set_inner(inner, entry) {
            #[cfg(feature = "tracing")]
            tracing::debug!(fingerprint = %entry.fingerprint, error = %_err, "cache write dropped");
        }
    }

    fn set_inner(inner: &StoreInner, entry: &CacheEntry) -> Result<(), CacheError> {
        let now = Utc::now();
        let expires_at = entry
            .expires_at
            .or_else(|| now.checked_add_signed(inner.ttl));
        let conn = Self::conn(inner);
        conn.execute(
            "INSERT INTO results (fingerprint, response, error, model, project, task_label,
                                  session_id, prompt_tokens, completion_tokens, cost_usd,
                                  duration_ms, created_at, accessed_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(fingerprint) DO UPDATE SET
                 response = excluded.response,
                 error = excluded.error,
                 model = excluded.model,
                 project = excluded.project,
                 task_label = excluded.task_label,
                 session_id = excluded.session_id,
                 prompt_tokens = excluded.prompt_tokens,
                 completion_tokens = excluded.completion_tokens,
                 cost_usd = excluded.cost_usd,
                 duration_ms = excluded.duration_ms,
                 created_at = excluded.created_at,
                 accessed_at = excluded.accessed_at,
                 expires_at = excluded.expires_at",
            params![
                entry.fingerprint,
                entry.response,
                entry.error,
                entry.model,
                entry.project,
                entry.task_label,
                entry.session_id,
                entry.metrics.prompt_tokens as i64,
                entry.metrics.completion_tokens as i64,
                entry.metrics.cost_usd,
                entry.metrics.duration_ms as i64,
                entry.created_at.to_rfc3339(),
                entry.accessed_at.to_rfc3339(),
                expires_at.map(|at| at.to_rfc3339()),
            ],
        )?;
        Self::bump_usage(
            &conn,
            &now,
            entry.model.as_deref().unwrap_or(""),
            entry.project.as_deref().unwrap_or(""),
            false,
            Some(&entry.metrics),
        )?;
        Ok(())
    }

    fn bump_usage(
        conn: &Connection,
        now: &DateTime<Utc>,
        model: &str,
        project: &str,
        hit: bool,
        metrics: Option<&CacheMetrics>,
    ) -> Result<(), CacheError> {
        let day = now.format("%Y-%m-%d").to_string();
        let (hits, misses) = if metrics.is_some() {
            // A write is neither a hit nor a miss.
            (0_i64, 0_i64)
        } else if hit {
            (1, 0)
        } else {
            (0, 1)
        };
        let m = metrics.cloned().unwrap_or_default();
        conn.execute(
            "INSERT INTO usage (day, model, project, hits, misses, prompt_tokens,
                                completion_tokens, cost_usd)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(day, model, project) DO UPDATE SET
                 hits = hits + excluded.hits,
                 misses = misses + excluded.misses,
                 prompt_tokens = prompt_tokens + excluded.prompt_tokens,
                 completion_tokens = completion_tokens + excluded.completion_tokens,
                 cost_usd = cost_usd + excluded.cost_usd",
            params![
                day,
                model,
                project,
                hits,
                misses,
                m.prompt_tokens as i64,
                m.completion_tokens as i64,
                m.cost_usd,
            ],
        )?;
        Ok(())
    }

    /// Removes rows matching the scope. Returns how many were deleted
    /// (zero when disabled or on error).
    pub fn clear(&self, scope: ClearScope) -> u64 {
        let Some(inner) = self.inner.as_ref() else {
            return 0;
        };
        let result = {
            let conn = Self::conn(inner);
            match scope {
                ClearScope::All => conn.execute("DELETE FROM results", []),
                ClearScope::Project(project) => conn.execute(
                    "DELETE FROM results WHERE project = ?1",
                    params![project],
                ),
                ClearScope::OlderThan(age) => {
                    let cutoff = Utc::now()
                        - ChronoDuration::from_std(age).unwrap_or(ChronoDuration::zero());
                    conn.execute(
                        "DELETE FROM results WHERE created_at <= ?1",
                        params![cutoff.to_rfc3339()],
                    )
                }
            }
        };
        match result {
            Ok(n) => n as u64,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %_err, "cache clear failed");
                0
            }
        }
    }

    /// Deletes expired rows. Returns how many were reaped.
    pub fn reap(&self) -> u64 {
        let Some(inner) = self.inner.as_ref() else {
            return 0;
        };
        let now = Utc::now().to_rfc3339();
        let conn = Self::conn(inner);
        match conn.execute(
            "DELETE FROM results WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now],
        ) {
            Ok(n) => n as u64,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %_err, "cache reap failed");
                0
            }
        }
    }

    /// Reads the aggregate usage table, oldest day first.
    #[must_use]
    pub fn stats(&self) -> Vec<UsageRow> {
        let Some(inner) = self.inner.as_ref() else {
            return Vec::new();
        };
        let conn = Self::conn(inner);
        let result = conn
            .prepare(
                "SELECT day, model, project, hits, misses, prompt_tokens, completion_tokens,
                        cost_usd
                 FROM usage ORDER BY day, model, project",
            )
            .and_then(|mut stmt| {
                stmt.query_map([], |row| {
                    Ok(UsageRow {
                        day: row.get(0)?,
                        model: row.get(1)?,
                        project: row.get(2)?,
                        hits: row.get::<_, i64>(3)? as u64,
                        misses: row.get::<_, i64>(4)? as u64,
                        prompt_tokens: row.get::<_, i64>(5)? as u64,
                        completion_tokens: row.get::<_, i64>(6)? as u64,
                        cost_usd: row.get(7)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()
            });
        result.unwrap_or_default()
    }

    /// Async lookup that hops through `spawn_blocking`.
    pub async fn get_async(&self, fingerprint: &str) -> Option<CacheEntry> {
        let cache = self.clone();
        let fingerprint = fingerprint.to_string();
        tokio::task::spawn_blocking(move || cache.get(&fingerprint))
            .await
            .ok()
            .flatten()
    }

    /// Async upsert that hops through `spawn_blocking`.
    pub async fn set_async(&self, entry: CacheEntry) {
        let cache = self.clone();
        let _ = tokio::task::spawn_blocking(move || cache.set(&entry)).await;
    }

    /// Spawns the hourly background reaper. The handle may be aborted;
    /// foreground reads never wait on it.
    pub fn spawn_reaper(&self) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(REAP_INTERVAL);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let reaper = cache.clone();
                let _ = tokio::task::spawn_blocking(move || reaper.reap()).await;
            }
        })
    }
}

/// Row fetched as primitives before timestamp parsing.
struct RawRow {
    fingerprint: String,
    response: String,
    error: Option<String>,
    model: Option<String>,
    project: Option<String>,
    task_label: Option<String>,
    session_id: Option<String>,
    prompt_tokens: i64,
    completion_tokens: i64,
    cost_usd: f64,
    duration_ms: i64,
    created_at: String,
    accessed_at: String,
    expires_at: Option<String>,
}

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        fingerprint: row.get(0)?,
        response: row.get(1)?,
        error: row.get(2)?,
        model: row.get(3)?,
        project: row.get(4)?,
        task_label: row.get(5)?,
        session_id: row.get(6)?,
        prompt_tokens: row.get(7)?,
        completion_tokens: row.get(8)?,
        cost_usd: row.get(9)?,
        duration_ms: row.get(10)?,
        created_at: row.get(11)?,
        accessed_at: row.get(12)?,
        expires_at: row.get(13)?,
    })
}

impl RawRow {
    fn into_entry(self) -> Result<CacheEntry, CacheError> {
        fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
            Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
        }
        let expires_at = match self.expires_at.as_deref() {
            Some(s) => Some(parse(s)?),
            None => None,
        };
        Ok(CacheEntry {
            fingerprint: self.fingerprint,
            response: self.response,
            error: self.error,
            metrics: CacheMetrics {
                prompt_tokens: self.prompt_tokens.max(0) as u64,
                completion_tokens: self.completion_tokens.max(0) as u64,
                cost_usd: self.cost_usd,
                duration_ms: self.duration_ms.max(0) as u64,
            },
            model: self.model,
            project: self.project,
            task_label: self.task_label,
            session_id: self.session_id,
            created_at: parse(&self.created_at)?,
            accessed_at: parse(&self.accessed_at)?,
            expires_at,
        })
    }
}
