pub mod api;
pub mod canonical;
pub mod db;
pub mod dedup;
pub mod feed;
pub mod ingest;
pub mod liveness;
pub mod logging;
pub mod ranking;
pub mod run_id;
pub mod schema;
pub mod source;
pub mod vectorize;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};

/// Where a posting came from. `Company` and `Aggregator` carry the board or
/// company name so two aggregators never share a source-id namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum JobSource {
    #[default]
    Internal,
    Company(String),
    Aggregator(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    Internal,
    Company,
    Aggregator,
}

impl JobSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            JobSource::Internal => SourceKind::Internal,
            JobSource::Company(_) => SourceKind::Company,
            JobSource::Aggregator(_) => SourceKind::Aggregator,
        }
    }

    /// Board/company name; the internal board has a fixed one.
    pub fn name(&self) -> &str {
        match self {
            JobSource::Internal => "internal",
            JobSource::Company(name) | JobSource::Aggregator(name) => name,
        }
    }

    pub fn from_parts(kind: SourceKind, name: &str) -> Self {
        match kind {
            SourceKind::Internal => JobSource::Internal,
            SourceKind::Company => JobSource::Company(name.to_string()),
            SourceKind::Aggregator => JobSource::Aggregator(name.to_string()),
        }
    }
}

/// Liveness is tri-state; `Unknown` only ever appears before the first
/// successful probe. Transitions are owned by `liveness::state`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum LivenessStatus {
    #[default]
    Unknown,
    Active,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum WorkType {
    Remote,
    Hybrid,
    Onsite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Seniority {
    Intern,
    Junior,
    Mid,
    Senior,
    Lead,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalCompany {
    /// Slug id derived from the canonical name ("acme-robotics").
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Original text, kept for audit and fuzzy comparison.
    pub raw: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalaryRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub currency: Option<String>,
}

/// One contributing raw record behind a canonical job. A job absorbed from a
/// second source keeps both entries here; nothing is ever dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct LineageEntry {
    pub source: JobSource,
    pub source_id: String,
    pub trust_score: u8,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Canonical job record. One row per real-world opening; raw duplicates are
/// folded into `lineage`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Job {
    pub canonical_id: String,
    pub source: JobSource,
    pub source_id: String,

    pub title: String,
    pub company: CanonicalCompany,
    pub location: Location,
    pub description: String,
    pub skills: Vec<String>,
    pub seniority: Option<Seniority>,
    pub work_type: Option<WorkType>,
    pub salary: Option<SalaryRange>,
    pub url: String,

    pub trust_score: u8,
    pub liveness: LivenessStatus,
    pub first_seen_at: DateTime<Utc>,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub next_probe_at: Option<DateTime<Utc>>,
    pub probe_failures: u32,
    /// Outside the supported market; stored and auditable, excluded from
    /// default feeds.
    pub out_of_scope: bool,

    pub lineage: Vec<LineageEntry>,
}

/// Raw adapter output, before canonicalization. Field shapes mirror what the
/// origin gives us; everything optional may legitimately be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPosting {
    pub source: JobSource,
    pub source_id: Option<String>,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub salary_text: Option<String>,
    pub work_type_text: Option<String>,
    pub seniority_text: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub years: Option<f32>,
}

/// Read-only view of a candidate, owned by the profile subsystem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateProfile {
    pub candidate_id: String,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<String>,
    pub location_preference: Option<String>,
    pub salary_expectation: Option<u32>,
    pub seniority: Option<Seniority>,
}

impl CandidateProfile {
    /// Stable content hash over the structured fields (first 16 hex chars of
    /// SHA-256). Feed cache keys and the vector cache are invalidated through
    /// this value, so every field that influences ranking must feed it.
    pub fn profile_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.candidate_id.as_bytes());
        for skill in &self.skills {
            hasher.update([0x1f]);
            hasher.update(skill.as_bytes());
        }
        for entry in &self.experience {
            hasher.update([0x1e]);
            hasher.update(entry.title.as_bytes());
            hasher.update([0x1f]);
            hasher.update(entry.company.as_bytes());
            if let Some(years) = entry.years {
                hasher.update(years.to_le_bytes());
            }
        }
        for school in &self.education {
            hasher.update([0x1e]);
            hasher.update(school.as_bytes());
        }
        if let Some(ref pref) = self.location_preference {
            hasher.update([0x1e]);
            hasher.update(pref.as_bytes());
        }
        if let Some(salary) = self.salary_expectation {
            hasher.update(salary.to_le_bytes());
        }
        if let Some(seniority) = self.seniority {
            hasher.update(seniority.to_string().as_bytes());
        }

        let bytes = hasher.finalize();
        let mut hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        hex.truncate(16);
        hex
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub semantic: f64,
    pub recency: f64,
    pub liveness: f64,
    pub personalization: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TrustBadge {
    VerifiedActive,
    DirectFromCompany,
}

/// Ephemeral ranking output; lives only as long as its feed cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub candidate_id: String,
    pub job_id: String,
    pub breakdown: ScoreBreakdown,
    pub final_score: f64,
    pub matched_skills: Vec<String>,
    pub explanation: String,
    pub badges: Vec<TrustBadge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> CandidateProfile {
        CandidateProfile {
            candidate_id: "cand-1".into(),
            skills: vec!["rust".into(), "postgresql".into()],
            experience: vec![ExperienceEntry {
                title: "Backend Engineer".into(),
                company: "Acme".into(),
                years: Some(3.5),
            }],
            education: vec!["BSc Computer Science".into()],
            location_preference: Some("Portland, OR".into()),
            salary_expectation: Some(140_000),
            seniority: Some(Seniority::Mid),
        }
    }

    #[test]
    fn profile_hash_is_stable_and_16_chars() {
        let profile = sample_profile();
        let first = profile.profile_hash();
        let second = profile.profile_hash();
        assert_eq!(first, second);
        assert_eq!(first.len(), 16);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn profile_hash_changes_when_skills_change() {
        let profile = sample_profile();
        let mut updated = profile.clone();
        updated.skills.push("kubernetes".into());
        assert_ne!(profile.profile_hash(), updated.profile_hash());
    }

    #[test]
    fn profile_hash_changes_when_experience_changes() {
        let profile = sample_profile();
        let mut updated = profile.clone();
        updated.experience[0].years = Some(4.0);
        assert_ne!(profile.profile_hash(), updated.profile_hash());
    }

    #[test]
    fn liveness_status_round_trips_through_strings() {
        for status in [
            LivenessStatus::Unknown,
            LivenessStatus::Active,
            LivenessStatus::Stale,
        ] {
            let text = status.to_string();
            let parsed: LivenessStatus = text.parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn source_kind_and_name_round_trip() {
        let source = JobSource::Aggregator("jobhub".into());
        let rebuilt = JobSource::from_parts(source.kind(), source.name());
        assert_eq!(rebuilt, source);

        assert_eq!(JobSource::Internal.name(), "internal");
        assert_eq!(JobSource::Internal.kind().to_string(), "internal");
    }
}
