use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use crate::CandidateProfile;

use super::{Embedding, VECTORIZER_VERSION, Vectorizer};

pub const DEFAULT_VECTOR_CACHE_CAPACITY: usize = 4_096;

/// Candidate embeddings keyed by profile content hash. Keys are
/// content-addressed, so an entry can never go stale: a profile edit changes
/// the hash and the old vector simply ages out of the LRU bound.
pub struct CandidateVectorCache {
    entries: Mutex<LruCache<String, Arc<Embedding>>>,
}

impl CandidateVectorCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("clamped above zero");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_VECTOR_CACHE_CAPACITY)
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Arc<Embedding>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The embedder version and dimension are part of the key, so a seed or
    /// config change invalidates every cached vector at once.
    fn cache_key(vectorizer: &Vectorizer, profile: &CandidateProfile) -> String {
        format!(
            "{VECTORIZER_VERSION}:{}:{}",
            vectorizer.dimension(),
            profile.profile_hash()
        )
    }

    /// Vector for the profile's current content, embedding on first sight of
    /// a hash. Embedding is deterministic, so two racing computes for the
    /// same key produce identical vectors and last-write-wins is safe.
    pub fn get_or_embed(
        &self,
        vectorizer: &Vectorizer,
        profile: &CandidateProfile,
    ) -> Arc<Embedding> {
        let key = Self::cache_key(vectorizer, profile);
        if let Some(cached) = self.lock().get(&key) {
            return Arc::clone(cached);
        }

        let embedding = Arc::new(vectorizer.embed_candidate(profile));
        self.lock().put(key, Arc::clone(&embedding));
        embedding
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
    use crate::vectorize::VectorizerConfig;

    fn profile(skills: &[&str]) -> CandidateProfile {
        CandidateProfile {
            candidate_id: "cand-1".into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            ..CandidateProfile::default()
        }
    }

    #[test]
    fn same_profile_hash_reuses_the_cached_vector() {
        let vectorizer = Vectorizer::new(VectorizerConfig::default());
        let cache = CandidateVectorCache::with_defaults();
        let candidate = profile(&["rust", "postgresql"]);

        let first = cache.get_or_embed(&vectorizer, &candidate);
        let second = cache.get_or_embed(&vectorizer, &candidate);

        assert!(Arc::ptr_eq(&first, &second), "second call must be a cache hit");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn profile_edit_computes_a_fresh_vector() {
        let vectorizer = Vectorizer::new(VectorizerConfig::default());
        let cache = CandidateVectorCache::with_defaults();

        let before = cache.get_or_embed(&vectorizer, &profile(&["rust"]));
        let after = cache.get_or_embed(&vectorizer, &profile(&["rust", "kubernetes"]));

        assert!(!Arc::ptr_eq(&before, &after));
        assert_ne!(before.vector, after.vector);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn capacity_bound_evicts_old_entries() {
        let vectorizer = Vectorizer::new(VectorizerConfig::default());
        let cache = CandidateVectorCache::new(2);

        cache.get_or_embed(&vectorizer, &profile(&["rust"]));
        cache.get_or_embed(&vectorizer, &profile(&["python"]));
        cache.get_or_embed(&vectorizer, &profile(&["golang"]));

        assert_eq!(cache.len(), 2);
    }
}
