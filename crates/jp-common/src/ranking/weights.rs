/// Default feed weights. Semantic relevance dominates; recency and
/// liveness keep the feed fresh and honest; personalization is a
/// tie-break signal, not a driver.
pub const FEED_WEIGHTS: RankWeights = RankWeights {
    semantic: 0.45,
    recency: 0.25,
    liveness: 0.20,
    personalization: 0.10,
};

/// Discovery weights for profiles with no declared skills. Semantic
/// similarity is meaningless against an empty skill set, so the budget
/// shifts to freshness and verified liveness instead of filtering
/// everything out.
pub const DISCOVERY_WEIGHTS: RankWeights = RankWeights {
    semantic: 0.0,
    recency: 0.50,
    liveness: 0.30,
    personalization: 0.20,
};

#[derive(Debug, Clone, Copy)]
pub struct RankWeights {
    pub semantic: f64,
    pub recency: f64,
    pub liveness: f64,
    pub personalization: f64,
}

impl RankWeights {
    pub fn sum(&self) -> f64 {
        self.semantic + self.recency + self.liveness + self.personalization
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        assert!((FEED_WEIGHTS.sum() - 1.0).abs() < 1e-6);
        assert!((DISCOVERY_WEIGHTS.sum() - 1.0).abs() < 1e-6);
    }
}
