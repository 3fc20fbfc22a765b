use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;

use crate::MatchResult;

/// Monotonically increasing corpus counter, bumped once per completed
/// ingestion batch and persisted in `ingestion_runs`.
pub type CorpusVersion = i64;

pub const DEFAULT_FEED_CACHE_CAPACITY: usize = 10_000;

/// TTL backstop. Key mismatches already handle profile and corpus changes;
/// expiry bounds the damage if corpus-version bookkeeping ever goes wrong.
pub const DEFAULT_FEED_TTL_HOURS: i64 = 6;

/// Any component changing makes the old entry unreachable, so stale feeds
/// are never served after a profile edit or a completed ingestion batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey {
    pub candidate_id: String,
    pub profile_hash: String,
    pub corpus_version: CorpusVersion,
}

#[derive(Debug, Clone)]
pub struct CachedFeed {
    pub results: Vec<MatchResult>,
    pub cached_at: DateTime<Utc>,
}

pub struct FeedCache {
    entries: Mutex<LruCache<FeedKey, CachedFeed>>,
    ttl: Duration,
}

impl FeedCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("clamped above zero");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            DEFAULT_FEED_CACHE_CAPACITY,
            Duration::hours(DEFAULT_FEED_TTL_HOURS),
        )
    }

    /// A poisoned lock only means a panic mid-insert; the cache content is
    /// still safe to serve, so recover rather than propagate.
    fn lock(&self) -> MutexGuard<'_, LruCache<FeedKey, CachedFeed>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Expired entries are evicted on read rather than returned.
    pub fn get(&self, key: &FeedKey, now: DateTime<Utc>) -> Option<Vec<MatchResult>> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if now - entry.cached_at <= self.ttl => {
                return Some(entry.results.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    /// Concurrent writers for the same key always computed the same feed,
    /// so last-write-wins is safe.
    pub fn put(&self, key: FeedKey, results: Vec<MatchResult>, now: DateTime<Utc>) {
        let mut entries = self.lock();
        entries.put(
            key,
            CachedFeed {
                results,
                cached_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScoreBreakdown;

    fn key(candidate: &str, hash: &str, version: CorpusVersion) -> FeedKey {
        FeedKey {
            candidate_id: candidate.to_string(),
            profile_hash: hash.to_string(),
            corpus_version: version,
        }
    }

    fn sample_results() -> Vec<MatchResult> {
        vec![MatchResult {
            candidate_id: "cand-1".into(),
            job_id: "job-1".into(),
            breakdown: ScoreBreakdown::default(),
            final_score: 0.85,
            matched_skills: vec!["rust".into()],
            explanation: "Backend Engineer at Acme: Matches your skills: rust.".into(),
            badges: vec![],
        }]
    }

    #[test]
    fn hit_requires_every_key_component() {
        let cache = FeedCache::with_defaults();
        let now = Utc::now();
        cache.put(key("cand-1", "aaaa", 3), sample_results(), now);

        assert!(cache.get(&key("cand-1", "aaaa", 3), now).is_some());
        assert!(cache.get(&key("cand-1", "bbbb", 3), now).is_none());
        assert!(cache.get(&key("cand-1", "aaaa", 4), now).is_none());
        assert!(cache.get(&key("cand-2", "aaaa", 3), now).is_none());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = FeedCache::new(16, Duration::hours(6));
        let cached_at = Utc::now();
        cache.put(key("cand-1", "aaaa", 1), sample_results(), cached_at);

        let before_expiry = cached_at + Duration::hours(5);
        assert!(cache.get(&key("cand-1", "aaaa", 1), before_expiry).is_some());

        let after_expiry = cached_at + Duration::hours(7);
        assert!(cache.get(&key("cand-1", "aaaa", 1), after_expiry).is_none());
        assert!(cache.is_empty(), "expired entry should be evicted on read");
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = FeedCache::new(2, Duration::hours(6));
        let now = Utc::now();
        cache.put(key("cand-1", "aaaa", 1), sample_results(), now);
        cache.put(key("cand-2", "bbbb", 1), sample_results(), now);
        cache.put(key("cand-3", "cccc", 1), sample_results(), now);

        assert!(cache.get(&key("cand-1", "aaaa", 1), now).is_none());
        assert!(cache.get(&key("cand-3", "cccc", 1), now).is_some());
    }

    #[test]
    fn overwrite_replaces_previous_entry() {
        let cache = FeedCache::with_defaults();
        let now = Utc::now();
        cache.put(key("cand-1", "aaaa", 1), sample_results(), now);
        cache.put(key("cand-1", "aaaa", 1), vec![], now);

        let cached = cache.get(&key("cand-1", "aaaa", 1), now).unwrap();
        assert!(cached.is_empty());
    }
}
