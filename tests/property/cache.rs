//! Properties of the result cache: round-trip fidelity and expiry.

use proptest::prelude::*;
use std::time::Duration;
use taskpool_cache::{fingerprint, CacheEntry, CacheMetrics, ResultCache};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Set-then-get returns the entry's observable fields, with only
    /// `accessed_at` advanced.
    #[test]
    fn round_trip_preserves_observable_fields(
        payload in ".{0,200}",
        model in "[a-z0-9-]{1,16}",
        project in "[a-z]{1,12}",
        prompt_tokens in 0u64..100_000,
        completion_tokens in 0u64..100_000,
        duration_ms in 0u64..600_000,
    ) {
        let cache = ResultCache::in_memory(Duration::from_secs(3600));
        let fp = fingerprint([payload.as_str(), model.as_str()]);
        let entry = CacheEntry::success(&fp, payload.clone())
            .with_model(model.clone())
            .with_project(project.clone())
            .with_metrics(CacheMetrics {
                prompt_tokens,
                completion_tokens,
                cost_usd: 0.0,
                duration_ms,
            });
        cache.set(&entry);

        let got = cache.get(&fp).expect("fresh set must hit");
        prop_assert_eq!(got.response, entry.response);
        prop_assert_eq!(got.error, entry.error);
        prop_assert_eq!(got.metrics, entry.metrics);
        prop_assert_eq!(got.model, entry.model);
        prop_assert_eq!(got.project, entry.project);
        prop_assert!(got.accessed_at >= entry.accessed_at);
    }

    /// Expired rows are misses; re-setting revives the key.
    #[test]
    fn expiry_then_refresh(payload in ".{1,64}") {
        let cache = ResultCache::in_memory(Duration::from_secs(3600));
        let fp = fingerprint([payload.as_str()]);

        let mut stale = CacheEntry::success(&fp, "stale");
        stale.expires_at = Some(chrono::Utc::now() - chrono::Duration::seconds(1));
        cache.set(&stale);
        prop_assert!(cache.get(&fp).is_none());

        cache.set(&CacheEntry::success(&fp, payload.clone()));
        let got = cache.get(&fp).expect("refreshed key must hit");
        prop_assert_eq!(got.response, payload);
    }

    /// Upserts are idempotent: the last write is the one observed.
    #[test]
    fn last_write_wins(first in ".{0,64}", second in ".{0,64}") {
        let cache = ResultCache::in_memory(Duration::from_secs(3600));
        let fp = fingerprint(["upsert-key"]);
        cache.set(&CacheEntry::success(&fp, first));
        cache.set(&CacheEntry::success(&fp, second.clone()));
        prop_assert_eq!(cache.get(&fp).expect("hit").response, second);
    }

    /// Fingerprints are stable, 64-hex, and input-sensitive.
    #[test]
    fn fingerprints_behave(a in ".{0,64}", b in ".{0,64}") {
        let fa = fingerprint([a.as_str()]);
        prop_assert_eq!(fa.len(), 64);
        prop_assert!(fa.chars().all(|c| c.is_ascii_hexdigit()));
        prop_assert_eq!(&fa, &fingerprint([a.as_str()]));
        if a != b {
            prop_assert_ne!(fa, fingerprint([b.as_str()]));
        }
    }
}
