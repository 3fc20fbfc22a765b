use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::vectorize::{CandidateVectorCache, Embedding, Vectorizer};
use crate::{CandidateProfile, Job, LivenessStatus, MatchResult, ScoreBreakdown};

use super::scoring::{
    FEED_LIMIT, SCORE_THRESHOLD, badges_for, build_explanation, liveness_score, matched_skills,
    recency_score,
};
use super::weights::{DISCOVERY_WEIGHTS, FEED_WEIGHTS, RankWeights};

/// Recent-interaction summary from the candidate-actions subsystem. Companies
/// and skills are pulled from jobs the candidate saved or applied to; both
/// sets are matched case-insensitively against lowercase keys.
#[derive(Debug, Clone, Default)]
pub struct InteractionSignal {
    pub company_ids: HashSet<String>,
    pub skills: HashSet<String>,
}

impl InteractionSignal {
    pub fn is_empty(&self) -> bool {
        self.company_ids.is_empty() && self.skills.is_empty()
    }

    /// Overlap in [0, 1]: a company the candidate already engaged with is
    /// worth half the signal, skill overlap fills the rest proportionally.
    fn overlap(&self, job: &Job) -> f64 {
        if self.is_empty() {
            return 0.0;
        }

        let company = if self.company_ids.contains(&job.company.id) {
            0.5
        } else {
            0.0
        };

        let skill = if job.skills.is_empty() {
            0.0
        } else {
            let hits = job
                .skills
                .iter()
                .filter(|s| self.skills.contains(&s.to_lowercase()))
                .count();
            0.5 * hits as f64 / job.skills.len() as f64
        };

        company + skill
    }
}

/// Scores a corpus against one candidate. Pure and deterministic: the same
/// profile, jobs, signal and clock always produce the same feed, so cached
/// and recomputed results are interchangeable.
pub struct RankingEngine {
    vectorizer: Vectorizer,
    vectors: CandidateVectorCache,
}

impl RankingEngine {
    pub fn new(vectorizer: Vectorizer) -> Self {
        Self {
            vectorizer,
            vectors: CandidateVectorCache::with_defaults(),
        }
    }

    /// Daily feed for one candidate: filter, score, threshold at 0.60,
    /// sort, cap at 15. Never padded. Stale and out-of-scope jobs and
    /// anything the candidate already acted on are dropped before scoring.
    pub fn rank(
        &self,
        profile: &CandidateProfile,
        jobs: &[Job],
        excluded_job_ids: &HashSet<String>,
        signal: &InteractionSignal,
        now: DateTime<Utc>,
    ) -> Vec<MatchResult> {
        let weights = weights_for(profile);
        let profile_embedding = self.vectors.get_or_embed(&self.vectorizer, profile);

        let mut scored: Vec<(MatchResult, u8, Option<DateTime<Utc>>)> = jobs
            .iter()
            .filter(|job| {
                !job.out_of_scope
                    && job.liveness != LivenessStatus::Stale
                    && !excluded_job_ids.contains(&job.canonical_id)
            })
            .map(|job| {
                let result = self.score(profile, &profile_embedding, job, signal, weights, now);
                (result, job.trust_score, job.posted_at)
            })
            .filter(|(result, _, _)| result.final_score >= SCORE_THRESHOLD)
            .collect();

        scored.sort_by(|(a, a_trust, a_posted), (b, b_trust, b_posted)| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b_trust.cmp(a_trust))
                .then_with(|| b_posted.cmp(a_posted))
        });
        scored.truncate(FEED_LIMIT);

        scored.into_iter().map(|(result, _, _)| result).collect()
    }

    /// Full breakdown for a single job, bypassing the feed filters so the
    /// breakdown endpoint can explain stale and sub-threshold matches too.
    pub fn breakdown(
        &self,
        profile: &CandidateProfile,
        job: &Job,
        signal: &InteractionSignal,
        now: DateTime<Utc>,
    ) -> MatchResult {
        let embedding = self.vectors.get_or_embed(&self.vectorizer, profile);
        self.score(profile, &embedding, job, signal, weights_for(profile), now)
    }

    fn score(
        &self,
        profile: &CandidateProfile,
        profile_embedding: &Embedding,
        job: &Job,
        signal: &InteractionSignal,
        weights: RankWeights,
        now: DateTime<Utc>,
    ) -> MatchResult {
        let job_embedding = self.vectorizer.embed_job(job);
        let breakdown = ScoreBreakdown {
            semantic: f64::from(self.vectorizer.similarity(profile_embedding, &job_embedding))
                .clamp(0.0, 1.0),
            recency: recency_score(job, now).clamp(0.0, 1.0),
            liveness: liveness_score(job.liveness),
            personalization: signal.overlap(job).clamp(0.0, 1.0),
        };

        let final_score = weights.semantic * breakdown.semantic
            + weights.recency * breakdown.recency
            + weights.liveness * breakdown.liveness
            + weights.personalization * breakdown.personalization;

        let matched = matched_skills(&job.skills, &profile.skills);
        let explanation = build_explanation(job, &breakdown, &matched);

        MatchResult {
            candidate_id: profile.candidate_id.clone(),
            job_id: job.canonical_id.clone(),
            breakdown,
            final_score,
            matched_skills: matched,
            explanation,
            badges: badges_for(job),
        }
    }
}

/// Profiles with no declared skills get the discovery weights; cosine
/// against an empty skill set would filter everything out otherwise.
fn weights_for(profile: &CandidateProfile) -> RankWeights {
    if profile.skills.is_empty() {
        DISCOVERY_WEIGHTS
    } else {
        FEED_WEIGHTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorize::VectorizerConfig;
    use crate::{CanonicalCompany, TrustBadge};
    use chrono::Duration;

    fn engine() -> RankingEngine {
        RankingEngine::new(Vectorizer::new(VectorizerConfig::default()))
    }

    fn job(id: &str, title: &str, skills: &[&str], liveness: LivenessStatus, trust: u8) -> Job {
        let now = Utc::now();
        Job {
            canonical_id: id.to_string(),
            title: title.to_string(),
            company: CanonicalCompany {
                id: "acme".into(),
                name: "Acme".into(),
            },
            skills: skills.iter().map(|s| s.to_string()).collect(),
            trust_score: trust,
            liveness,
            first_seen_at: now - Duration::days(1),
            posted_at: Some(now - Duration::days(1)),
            ..Job::default()
        }
    }

    fn react_candidate() -> CandidateProfile {
        CandidateProfile {
            candidate_id: "cand-1".into(),
            skills: vec!["React".into(), "Node.js".into()],
            ..CandidateProfile::default()
        }
    }

    #[test]
    fn strong_overlap_ranks_and_weak_overlap_is_excluded() {
        let jobs = vec![
            job(
                "job-a",
                "Senior React Engineer",
                &["react", "node.js"],
                LivenessStatus::Active,
                90,
            ),
            job(
                "job-b",
                "Warehouse Associate",
                &["forklift"],
                LivenessStatus::Stale,
                40,
            ),
        ];

        let feed = engine().rank(
            &react_candidate(),
            &jobs,
            &HashSet::new(),
            &InteractionSignal::default(),
            Utc::now(),
        );

        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].job_id, "job-a");
        assert!(feed[0].final_score >= SCORE_THRESHOLD);
        assert!(feed[0].final_score <= 1.0);
        assert!(feed[0].badges.contains(&TrustBadge::VerifiedActive));
        assert_eq!(
            feed[0].matched_skills,
            vec!["react".to_string(), "node.js".to_string()]
        );
    }

    #[test]
    fn scores_stay_within_unit_interval() {
        let jobs = vec![job(
            "job-a",
            "Senior React Engineer",
            &["react", "node.js"],
            LivenessStatus::Active,
            100,
        )];
        let signal = InteractionSignal {
            company_ids: HashSet::from(["acme".to_string()]),
            skills: HashSet::from(["react".to_string(), "node.js".to_string()]),
        };

        let feed = engine().rank(&react_candidate(), &jobs, &HashSet::new(), &signal, Utc::now());
        let result = &feed[0];
        for sub in [
            result.breakdown.semantic,
            result.breakdown.recency,
            result.breakdown.liveness,
            result.breakdown.personalization,
        ] {
            assert!((0.0..=1.0).contains(&sub), "sub-score out of range: {sub}");
        }
        assert!((0.0..=1.0).contains(&result.final_score));
    }

    #[test]
    fn excluded_ids_and_out_of_scope_never_appear() {
        let mut foreign = job(
            "job-foreign",
            "React Engineer",
            &["react", "node.js"],
            LivenessStatus::Active,
            90,
        );
        foreign.out_of_scope = true;

        let jobs = vec![
            job(
                "job-seen",
                "React Engineer",
                &["react", "node.js"],
                LivenessStatus::Active,
                90,
            ),
            foreign,
        ];
        let excluded = HashSet::from(["job-seen".to_string()]);

        let feed = engine().rank(
            &react_candidate(),
            &jobs,
            &excluded,
            &InteractionSignal::default(),
            Utc::now(),
        );
        assert!(feed.is_empty());
    }

    #[test]
    fn feed_is_capped_and_never_padded() {
        let jobs: Vec<Job> = (0..30)
            .map(|i| {
                job(
                    &format!("job-{i}"),
                    "React Engineer",
                    &["react", "node.js"],
                    LivenessStatus::Active,
                    90,
                )
            })
            .collect();

        let feed = engine().rank(
            &react_candidate(),
            &jobs,
            &HashSet::new(),
            &InteractionSignal::default(),
            Utc::now(),
        );
        assert_eq!(feed.len(), FEED_LIMIT);

        let feed = engine().rank(
            &react_candidate(),
            &jobs[..3],
            &HashSet::new(),
            &InteractionSignal::default(),
            Utc::now(),
        );
        assert_eq!(feed.len(), 3);
    }

    #[test]
    fn equal_scores_tie_break_on_trust_then_posted_at() {
        let now = Utc::now();
        let mut older_trusted = job(
            "job-trusted",
            "React Engineer",
            &["react", "node.js"],
            LivenessStatus::Active,
            95,
        );
        let mut newer_plain = job(
            "job-plain",
            "React Engineer",
            &["react", "node.js"],
            LivenessStatus::Active,
            60,
        );
        let posted = now - Duration::days(2);
        older_trusted.posted_at = Some(posted);
        older_trusted.first_seen_at = posted;
        newer_plain.posted_at = Some(posted);
        newer_plain.first_seen_at = posted;

        let feed = engine().rank(
            &react_candidate(),
            &[newer_plain, older_trusted],
            &HashSet::new(),
            &InteractionSignal::default(),
            now,
        );
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].job_id, "job-trusted");
    }

    #[test]
    fn empty_skill_profile_uses_discovery_weights() {
        let browser = CandidateProfile {
            candidate_id: "cand-new".into(),
            ..CandidateProfile::default()
        };
        let jobs = vec![job(
            "job-a",
            "Data Engineer",
            &["python", "spark"],
            LivenessStatus::Active,
            90,
        )];

        let feed = engine().rank(
            &browser,
            &jobs,
            &HashSet::new(),
            &InteractionSignal::default(),
            Utc::now(),
        );

        // recency 1.0 * 0.50 + liveness 1.0 * 0.30 = 0.80, comfortably above
        // the threshold even with zero semantic signal.
        assert_eq!(feed.len(), 1);
        assert!(feed[0].final_score >= SCORE_THRESHOLD);
    }

    #[test]
    fn ranking_is_deterministic() {
        let jobs: Vec<Job> = (0..10)
            .map(|i| {
                job(
                    &format!("job-{i}"),
                    "React Engineer",
                    &["react"],
                    LivenessStatus::Active,
                    80,
                )
            })
            .collect();
        let now = Utc::now();

        let first = engine().rank(
            &react_candidate(),
            &jobs,
            &HashSet::new(),
            &InteractionSignal::default(),
            now,
        );
        let second = engine().rank(
            &react_candidate(),
            &jobs,
            &HashSet::new(),
            &InteractionSignal::default(),
            now,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn breakdown_explains_stale_jobs_too() {
        let stale = job(
            "job-stale",
            "React Engineer",
            &["react", "node.js"],
            LivenessStatus::Stale,
            70,
        );
        let result = engine().breakdown(
            &react_candidate(),
            &stale,
            &InteractionSignal::default(),
            Utc::now(),
        );
        assert_eq!(result.breakdown.liveness, 0.0);
        assert!(result.explanation.contains("may no longer be open"));
    }

    #[test]
    fn personalization_lifts_engaged_companies() {
        let profile = react_candidate();
        let target = job(
            "job-a",
            "React Engineer",
            &["react", "node.js"],
            LivenessStatus::Active,
            90,
        );
        let signal = InteractionSignal {
            company_ids: HashSet::from(["acme".to_string()]),
            skills: HashSet::new(),
        };

        let eng = engine();
        let now = Utc::now();
        let with_signal = eng.breakdown(&profile, &target, &signal, now);
        let without = eng.breakdown(&profile, &target, &InteractionSignal::default(), now);
        assert!(with_signal.final_score > without.final_score);
        assert_eq!(with_signal.breakdown.personalization, 0.5);
    }
}
