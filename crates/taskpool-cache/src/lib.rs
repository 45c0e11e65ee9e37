//! Content-addressed result cache backed by a single-file SQLite store.
//!
//! The cache maps a 64-hex SHA-256 [`fingerprint`] of request inputs to a
//! prior outcome, so repeated work (the same prompt against the same
//! model, the same dependency scan) is elided. Its failure policy is the
//! important part: **the store can never fail a task**. Every error on
//! open, read, or write degrades to "no cache" and is at most
//! debug-logged; `Get` after expiry is a miss; `Set` is an idempotent
//! upsert.
//!
//! The store opens with write-ahead journaling and a busy-retry window,
//! creates its schema idempotently, and keeps an aggregate usage table
//! keyed by `(day, model, project)` for statistics. Expired rows are
//! reaped out of band by [`ResultCache::spawn_reaper`]; foreground reads
//! never wait on the reaper.
//!
//! # Example
//!
//! ```no_run
//! use taskpool_cache::{fingerprint, CacheEntry, ResultCache};
//! use std::time::Duration;
//!
//! let cache = ResultCache::open("/tmp/taskpool.db".as_ref(), Duration::from_secs(3600));
//! let fp = fingerprint(["summarize README", "gpt-4o", "0.2", "1024"]);
//!
//! if cache.get(&fp).is_none() {
//!     // ... do the work ...
//!     cache.set(&CacheEntry::success(&fp, "the summary"));
//! }
//! ```

mod entry;
mod fingerprint;
mod store;

pub use entry::{CacheEntry, CacheMetrics};
pub use fingerprint::fingerprint;
pub use store::{ClearScope, ResultCache, UsageRow, REAP_INTERVAL};
