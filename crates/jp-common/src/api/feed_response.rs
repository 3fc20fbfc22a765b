use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::CorpusVersion;
use crate::{MatchResult, ScoreBreakdown};

/// Sub-score breakdown as served over the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct ScoreBreakdownDto {
    pub semantic: f64,
    pub recency: f64,
    pub liveness: f64,
    pub personalization: f64,
}

impl From<&ScoreBreakdown> for ScoreBreakdownDto {
    fn from(value: &ScoreBreakdown) -> Self {
        Self {
            semantic: value.semantic,
            recency: value.recency,
            liveness: value.liveness,
            personalization: value.personalization,
        }
    }
}

/// One ranked job for a candidate, as returned by the feed and the
/// per-job breakdown endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResultDto {
    pub candidate_id: String,
    pub job_id: String,
    pub final_score: f64,
    pub score_breakdown: ScoreBreakdownDto,
    pub matched_skills: Vec<String>,
    pub explanation: String,
    /// Badge names in snake_case, e.g. "verified_active".
    pub badges: Vec<String>,
}

impl From<&MatchResult> for MatchResultDto {
    fn from(value: &MatchResult) -> Self {
        Self {
            candidate_id: value.candidate_id.clone(),
            job_id: value.job_id.clone(),
            final_score: value.final_score,
            score_breakdown: ScoreBreakdownDto::from(&value.breakdown),
            matched_skills: value.matched_skills.clone(),
            explanation: value.explanation.clone(),
            badges: value.badges.iter().map(|b| b.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub candidate_id: String,
    pub corpus_version: CorpusVersion,
    pub generated_at: DateTime<Utc>,
    pub matches: Vec<MatchResultDto>,
}

impl FeedResponse {
    pub fn from_results(
        candidate_id: &str,
        corpus_version: CorpusVersion,
        generated_at: DateTime<Utc>,
        results: &[MatchResult],
    ) -> Self {
        Self {
            candidate_id: candidate_id.to_string(),
            corpus_version,
            generated_at,
            matches: results.iter().map(MatchResultDto::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrustBadge;

    fn sample_result() -> MatchResult {
        MatchResult {
            candidate_id: "cand-1".into(),
            job_id: "01ARZ3NDEKTSV4RRFFQ69G5FAV".into(),
            breakdown: ScoreBreakdown {
                semantic: 0.9,
                recency: 0.8,
                liveness: 1.0,
                personalization: 0.5,
            },
            final_score: 0.83,
            matched_skills: vec!["rust".into(), "postgresql".into()],
            explanation: "Backend Engineer at Acme: matches your skills.".into(),
            badges: vec![TrustBadge::VerifiedActive, TrustBadge::DirectFromCompany],
        }
    }

    #[test]
    fn badges_serialize_as_snake_case_names() {
        let dto = MatchResultDto::from(&sample_result());
        assert_eq!(dto.badges, vec!["verified_active", "direct_from_company"]);
    }

    #[test]
    fn feed_response_preserves_result_order() {
        let mut second = sample_result();
        second.job_id = "01BX5ZZKBKACTAV9WEVGEMMVS0".into();
        second.final_score = 0.71;

        let response =
            FeedResponse::from_results("cand-1", 4, Utc::now(), &[sample_result(), second]);

        assert_eq!(response.corpus_version, 4);
        assert_eq!(response.matches.len(), 2);
        assert!(response.matches[0].final_score > response.matches[1].final_score);
    }

    #[test]
    fn dto_round_trips_through_json() {
        let dto = MatchResultDto::from(&sample_result());
        let json = serde_json::to_string(&dto).unwrap();
        let back: MatchResultDto = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dto);
    }
}
