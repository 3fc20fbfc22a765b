pub mod cache;
pub mod config;
pub mod similarity;
pub mod tokenizer;

use siphasher::sip::SipHasher13;
use std::hash::{Hash, Hasher};

use crate::{CandidateProfile, Job};

pub use cache::CandidateVectorCache;
pub use config::VectorizerConfig;
pub use similarity::cosine_similarity;
pub use tokenizer::WeightedToken;

/// Fixed seeds for deterministic hashing. Changing either value changes
/// every embedding; bump `VECTORIZER_VERSION` and rebuild the corpus.
const HASH_SEED_K0: u64 = 0x9e37_79b9_7f4a_7c15;
const HASH_SEED_K1: u64 = 0x2545_f491_4f6c_dd1d;

/// Recorded alongside cached vectors so a tokenizer or seed change
/// invalidates them.
pub const VECTORIZER_VERSION: &str = "hash-v1";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmbeddingSource {
    Job,
    Candidate,
}

#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub source: EmbeddingSource,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Feature-hashing embedder over weighted tokens. No training, no model
/// files; SipHash13 with fixed seeds keeps vectors stable across builds.
pub struct Vectorizer {
    pub config: VectorizerConfig,
}

impl Vectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        let mut cfg = config;
        cfg.dimension = cfg.dimension.max(1);
        Self { config: cfg }
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn hash_token(&self, token: &str) -> usize {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        (hasher.finish() as usize) % self.config.dimension
    }

    fn tokens_to_embedding(&self, tokens: Vec<WeightedToken>, source: EmbeddingSource) -> Embedding {
        let mut vector = vec![0.0f32; self.config.dimension];

        for wt in &tokens {
            let idx = self.hash_token(&wt.token);
            // Sign hashing keeps the expected dot product of unrelated
            // token sets near zero.
            let sign = if self.hash_token(&format!("{}_sign", wt.token)) % 2 == 0 {
                1.0
            } else {
                -1.0
            };
            vector[idx] += sign * wt.weight;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Embedding {
            vector,
            source,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn embed_job(&self, job: &Job) -> Embedding {
        let tokens = tokenizer::tokenize_job(job);
        self.tokens_to_embedding(tokens, EmbeddingSource::Job)
    }

    pub fn embed_candidate(&self, profile: &CandidateProfile) -> Embedding {
        let tokens = tokenizer::tokenize_candidate(profile);
        self.tokens_to_embedding(tokens, EmbeddingSource::Candidate)
    }

    /// Similarity in [0, 1]; 0.5 means orthogonal.
    pub fn similarity(&self, a: &Embedding, b: &Embedding) -> f32 {
        cosine_similarity(&a.vector, &b.vector)
    }
}
