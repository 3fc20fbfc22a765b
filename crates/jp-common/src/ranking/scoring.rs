use chrono::{DateTime, Utc};

use crate::{Job, JobSource, LivenessStatus, ScoreBreakdown, TrustBadge};

/// A feed is never padded past this, and never padded up to it either.
pub const FEED_LIMIT: usize = 15;

/// Matches below this final score are dropped entirely.
pub const SCORE_THRESHOLD: f64 = 0.60;

/// Trust floor for the `VerifiedActive` badge.
pub const VERIFIED_TRUST_FLOOR: u8 = 85;

/// Half-life of the recency signal, in days.
const RECENCY_HALF_LIFE_DAYS: f64 = 7.0;

/// Exponential decay over posting age with a 7-day half-life. `posted_at`
/// is best-effort from the source; `first_seen_at` is the fallback anchor.
/// Future-dated postings clamp to 1.0.
pub fn recency_score(job: &Job, now: DateTime<Utc>) -> f64 {
    let anchor = job.posted_at.unwrap_or(job.first_seen_at);
    let age_days = (now - anchor).num_seconds() as f64 / 86_400.0;
    if age_days <= 0.0 {
        return 1.0;
    }
    0.5f64.powf(age_days / RECENCY_HALF_LIFE_DAYS).clamp(0.0, 1.0)
}

pub fn liveness_score(status: LivenessStatus) -> f64 {
    match status {
        LivenessStatus::Active => 1.0,
        LivenessStatus::Unknown => 0.5,
        LivenessStatus::Stale => 0.0,
    }
}

/// Case-insensitive intersection of the job's required skills with the
/// candidate's, in the job's declaration order.
pub fn matched_skills(job_skills: &[String], candidate_skills: &[String]) -> Vec<String> {
    job_skills
        .iter()
        .filter(|required| {
            candidate_skills
                .iter()
                .any(|owned| owned.eq_ignore_ascii_case(required))
        })
        .cloned()
        .collect()
}

pub fn badges_for(job: &Job) -> Vec<TrustBadge> {
    let mut badges = Vec::new();

    if job.trust_score >= VERIFIED_TRUST_FLOOR && job.liveness == LivenessStatus::Active {
        badges.push(TrustBadge::VerifiedActive);
    }

    let direct = matches!(job.source, JobSource::Company(_))
        || job
            .lineage
            .iter()
            .any(|entry| matches!(entry.source, JobSource::Company(_)));
    if direct {
        badges.push(TrustBadge::DirectFromCompany);
    }

    badges
}

/// Deterministic, human-readable summary of why a job ranked where it did.
/// Assembled purely from the scoring inputs; no generation step.
pub fn build_explanation(job: &Job, breakdown: &ScoreBreakdown, matched: &[String]) -> String {
    let mut parts = Vec::new();

    if matched.is_empty() {
        parts.push("No direct skill overlap".to_string());
    } else {
        parts.push(format!("Matches your skills: {}", matched.join(", ")));
    }

    if breakdown.recency >= 0.5 {
        parts.push("posted recently".to_string());
    }

    match job.liveness {
        LivenessStatus::Active => parts.push("verified still open".to_string()),
        LivenessStatus::Unknown => parts.push("not yet verified".to_string()),
        LivenessStatus::Stale => parts.push("may no longer be open".to_string()),
    }

    if breakdown.personalization > 0.0 {
        parts.push("similar to jobs you engaged with".to_string());
    }

    format!("{} at {}: {}.", job.title, job.company.name, parts.join("; "))
}
