pub mod engine;
pub mod scoring;
pub mod weights;

pub use engine::{InteractionSignal, RankingEngine};
pub use scoring::{
    FEED_LIMIT, SCORE_THRESHOLD, badges_for, build_explanation, liveness_score, matched_skills,
    recency_score,
};
pub use weights::{DISCOVERY_WEIGHTS, FEED_WEIGHTS, RankWeights};
