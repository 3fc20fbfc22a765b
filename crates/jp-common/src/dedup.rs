use chrono::{DateTime, Utc};
use strsim::normalized_damerau_levenshtein;
use ulid::Ulid;

use crate::canonical::{CanonicalDraft, location_key, normalize_title};
use crate::{Job, LineageEntry, LivenessStatus};

/// Normalized-title similarity at or above this merges cross-source copies.
pub const FUZZY_MERGE_THRESHOLD: f64 = 0.90;

/// Similarities in [floor, threshold) are too close to ignore but too far to
/// merge; they are logged for offline review and ingested standalone. False
/// negatives are preferred over wrong merges.
pub const FUZZY_AMBIGUOUS_FLOOR: f64 = 0.75;

#[derive(Debug, Clone, PartialEq)]
pub enum MergeDecision {
    Inserted,
    UpdatedInPlace,
    AbsorbedAsLineage { similarity: f64 },
    AmbiguousStandalone { similarity: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub canonical_id: String,
    pub is_new: bool,
    pub decision: MergeDecision,
}

/// In-memory working set of canonical jobs for one merge pass. The ingestion
/// orchestrator loads the relevant slice (same companies / source keys) from
/// the store, runs drafts through `merge_posting` in discovery order, then
/// persists the touched rows.
#[derive(Debug, Default)]
pub struct JobCorpus {
    pub jobs: Vec<Job>,
}

impl JobCorpus {
    pub fn from_jobs(jobs: Vec<Job>) -> Self {
        Self { jobs }
    }

    pub fn get(&self, canonical_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.canonical_id == canonical_id)
    }

    /// Merge one canonical draft into the corpus.
    ///
    /// Resolution order:
    /// 1. exact `(source, source_id)` hit on a job or any of its lineage
    ///    entries -> update in place (re-running a batch is a no-op),
    /// 2. fuzzy title match against same-company same-location jobs ->
    ///    absorb as lineage above the threshold, standalone in the
    ///    ambiguous band,
    /// 3. otherwise insert a new canonical job.
    pub fn merge_posting(&mut self, draft: CanonicalDraft, now: DateTime<Utc>) -> MergeOutcome {
        let source_key = draft
            .source_id
            .clone()
            .unwrap_or_else(|| draft.url.clone());

        if let Some(idx) = self.find_by_source_key(&draft, &source_key) {
            let canonical_id = self.jobs[idx].canonical_id.clone();
            self.update_in_place(idx, &draft, &source_key, now);
            return MergeOutcome {
                canonical_id,
                is_new: false,
                decision: MergeDecision::UpdatedInPlace,
            };
        }

        if let Some((idx, similarity)) = self.best_fuzzy_match(&draft) {
            if similarity >= FUZZY_MERGE_THRESHOLD {
                let canonical_id = self.jobs[idx].canonical_id.clone();
                self.absorb_as_lineage(idx, &draft, &source_key, now);
                return MergeOutcome {
                    canonical_id,
                    is_new: false,
                    decision: MergeDecision::AbsorbedAsLineage { similarity },
                };
            }
            if similarity >= FUZZY_AMBIGUOUS_FLOOR {
                tracing::info!(
                    similarity,
                    title = %draft.title,
                    company = %draft.company.id,
                    near_job = %self.jobs[idx].canonical_id,
                    "ambiguous duplicate kept standalone"
                );
                let canonical_id = self.insert_new(draft, now);
                return MergeOutcome {
                    canonical_id,
                    is_new: true,
                    decision: MergeDecision::AmbiguousStandalone { similarity },
                };
            }
        }

        let canonical_id = self.insert_new(draft, now);
        MergeOutcome {
            canonical_id,
            is_new: true,
            decision: MergeDecision::Inserted,
        }
    }

    fn find_by_source_key(&self, draft: &CanonicalDraft, source_key: &str) -> Option<usize> {
        self.jobs.iter().position(|job| {
            (job.source == draft.source && job.source_id == source_key)
                || job
                    .lineage
                    .iter()
                    .any(|entry| entry.source == draft.source && entry.source_id == source_key)
        })
    }

    fn best_fuzzy_match(&self, draft: &CanonicalDraft) -> Option<(usize, f64)> {
        self.jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| {
                job.company.id == draft.company.id
                    && location_key(&job.location) == draft.location_key
            })
            .map(|(idx, job)| {
                let similarity = normalized_damerau_levenshtein(
                    &draft.normalized_title,
                    &normalize_title(&job.title),
                );
                (idx, similarity)
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }

    fn update_in_place(
        &mut self,
        idx: usize,
        draft: &CanonicalDraft,
        source_key: &str,
        now: DateTime<Utc>,
    ) {
        // Re-verify liveness only when the primary URL materially changed;
        // a routine re-ingestion must not disturb the probe state.
        let is_primary = self.jobs[idx].source == draft.source
            && self.jobs[idx].source_id == source_key;
        if is_primary && self.jobs[idx].url != draft.url {
            self.jobs[idx].url = draft.url.clone();
            self.jobs[idx].liveness = LivenessStatus::Unknown;
            self.jobs[idx].next_probe_at = Some(now);
        }

        apply_field_tie_break(&mut self.jobs[idx], draft);

        let job = &mut self.jobs[idx];
        job.trust_score = job.trust_score.max(draft.trust_score);
        if let Some(entry) = job
            .lineage
            .iter_mut()
            .find(|entry| entry.source == draft.source && entry.source_id == source_key)
        {
            entry.last_seen_at = now;
            entry.trust_score = draft.trust_score;
        }
    }

    fn absorb_as_lineage(
        &mut self,
        idx: usize,
        draft: &CanonicalDraft,
        source_key: &str,
        now: DateTime<Utc>,
    ) {
        apply_field_tie_break(&mut self.jobs[idx], draft);

        let job = &mut self.jobs[idx];
        job.trust_score = job.trust_score.max(draft.trust_score);
        job.lineage.push(LineageEntry {
            source: draft.source.clone(),
            source_id: source_key.to_string(),
            trust_score: draft.trust_score,
            first_seen_at: now,
            last_seen_at: now,
        });
    }

    fn insert_new(&mut self, draft: CanonicalDraft, now: DateTime<Utc>) -> String {
        let canonical_id = Ulid::new().to_string();
        let source_key = draft
            .source_id
            .clone()
            .unwrap_or_else(|| draft.url.clone());

        self.jobs.push(Job {
            canonical_id: canonical_id.clone(),
            source: draft.source.clone(),
            source_id: source_key.clone(),
            title: draft.title,
            company: draft.company,
            location: draft.location,
            description: draft.description,
            skills: draft.skills,
            seniority: draft.seniority,
            work_type: draft.work_type,
            salary: draft.salary,
            url: draft.url,
            trust_score: draft.trust_score,
            liveness: LivenessStatus::Unknown,
            first_seen_at: now,
            last_verified_at: None,
            posted_at: draft.posted_at,
            next_probe_at: Some(now),
            probe_failures: 0,
            out_of_scope: draft.out_of_scope,
            lineage: vec![LineageEntry {
                source: draft.source,
                source_id: source_key,
                trust_score: draft.trust_score,
                first_seen_at: now,
                last_seen_at: now,
            }],
        });

        canonical_id
    }
}

/// Named tie-break rule for mutable fields (salary, description, posted_at):
/// the source with the higher current trust score wins; on equal trust the
/// most recently verified source wins, which for an incoming draft is the
/// draft itself. Everything else (title, url, location) keeps the canonical
/// record's values.
pub fn apply_field_tie_break(job: &mut Job, draft: &CanonicalDraft) {
    if draft.trust_score < job.trust_score {
        return;
    }

    if draft.salary.is_some() {
        job.salary = draft.salary.clone();
    }
    if !draft.description.is_empty() {
        job.description = draft.description.clone();
        job.skills = draft.skills.clone();
    }
    if draft.posted_at.is_some() {
        job.posted_at = draft.posted_at;
    }
    if draft.seniority.is_some() {
        job.seniority = draft.seniority;
    }
    if draft.work_type.is_some() {
        job.work_type = draft.work_type;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobSource;
    use crate::canonical::canonicalize_posting;
    use crate::{RawPosting, SalaryRange};

    fn aggregator_raw() -> RawPosting {
        RawPosting {
            source: JobSource::Aggregator("jobhub".into()),
            source_id: Some("jh-1".into()),
            title: "Senior Backend Engineer".into(),
            company: "Acme Robotics, Inc.".into(),
            location: "Portland, OR".into(),
            description: "Rust services on PostgreSQL.".into(),
            url: "https://jobhub.example.com/jh-1".into(),
            ..RawPosting::default()
        }
    }

    fn company_raw() -> RawPosting {
        RawPosting {
            source: JobSource::Company("acme-robotics".into()),
            source_id: Some("careers-42".into()),
            title: "Senior Backend Engineer".into(),
            company: "Acme Robotics".into(),
            location: "Portland, Oregon".into(),
            description: "Rust services on PostgreSQL, hybrid.".into(),
            url: "https://acme.example.com/careers/42".into(),
            salary_text: Some("$150k-$180k".into()),
            ..RawPosting::default()
        }
    }

    fn draft(raw: &RawPosting) -> CanonicalDraft {
        canonicalize_posting(raw, true).unwrap()
    }

    #[test]
    fn same_source_key_updates_in_place() {
        let mut corpus = JobCorpus::default();
        let now = Utc::now();

        let first = corpus.merge_posting(draft(&aggregator_raw()), now);
        assert!(first.is_new);

        let second = corpus.merge_posting(draft(&aggregator_raw()), now);
        assert!(!second.is_new);
        assert_eq!(second.decision, MergeDecision::UpdatedInPlace);
        assert_eq!(second.canonical_id, first.canonical_id);
        assert_eq!(corpus.jobs.len(), 1, "double ingest must not add a row");
    }

    #[test]
    fn cross_source_copy_is_absorbed_as_lineage() {
        let mut corpus = JobCorpus::default();
        let now = Utc::now();

        let original = corpus.merge_posting(draft(&company_raw()), now);
        let copy = corpus.merge_posting(draft(&aggregator_raw()), now);

        assert!(!copy.is_new);
        assert!(matches!(
            copy.decision,
            MergeDecision::AbsorbedAsLineage { similarity } if similarity >= FUZZY_MERGE_THRESHOLD
        ));
        assert_eq!(copy.canonical_id, original.canonical_id);

        let job = corpus.get(&original.canonical_id).unwrap();
        assert_eq!(job.lineage.len(), 2);
        assert_eq!(job.trust_score, 85, "highest contributing trust wins");
    }

    #[test]
    fn absorbed_copy_reingested_is_idempotent() {
        let mut corpus = JobCorpus::default();
        let now = Utc::now();

        corpus.merge_posting(draft(&company_raw()), now);
        corpus.merge_posting(draft(&aggregator_raw()), now);
        let again = corpus.merge_posting(draft(&aggregator_raw()), now);

        assert_eq!(again.decision, MergeDecision::UpdatedInPlace);
        assert_eq!(corpus.jobs.len(), 1);
        assert_eq!(corpus.jobs[0].lineage.len(), 2, "no lineage duplication");
    }

    #[test]
    fn tie_break_prefers_higher_trust_for_mutable_fields() {
        let mut corpus = JobCorpus::default();
        let now = Utc::now();

        // Aggregator first, with its own salary claim.
        let mut agg = aggregator_raw();
        agg.salary_text = Some("$100k-$120k".into());
        corpus.merge_posting(draft(&agg), now);

        // Company source arrives with a different salary; higher trust wins.
        corpus.merge_posting(draft(&company_raw()), now);
        let job = &corpus.jobs[0];
        assert_eq!(
            job.salary,
            Some(SalaryRange {
                min: Some(150_000),
                max: Some(180_000),
                currency: Some("USD".into()),
            })
        );

        // A later aggregator update must not clobber the company's fields.
        let mut cheaper = aggregator_raw();
        cheaper.salary_text = Some("$90k".into());
        corpus.merge_posting(draft(&cheaper), now);
        let job = &corpus.jobs[0];
        assert_eq!(job.salary.as_ref().unwrap().min, Some(150_000));
    }

    #[test]
    fn ambiguous_band_stays_standalone() {
        let mut corpus = JobCorpus::default();
        let now = Utc::now();

        corpus.merge_posting(draft(&company_raw()), now);

        let mut near_miss = aggregator_raw();
        near_miss.source_id = Some("jh-2".into());
        near_miss.title = "Senior Backend Engineer II".into();
        let outcome = corpus.merge_posting(draft(&near_miss), now);

        assert!(outcome.is_new);
        assert!(matches!(
            outcome.decision,
            MergeDecision::AmbiguousStandalone { similarity }
                if (FUZZY_AMBIGUOUS_FLOOR..FUZZY_MERGE_THRESHOLD).contains(&similarity)
        ));
        assert_eq!(corpus.jobs.len(), 2);
    }

    #[test]
    fn different_company_never_merges() {
        let mut corpus = JobCorpus::default();
        let now = Utc::now();

        corpus.merge_posting(draft(&company_raw()), now);

        let mut other = aggregator_raw();
        other.company = "Globex Corporation".into();
        let outcome = corpus.merge_posting(draft(&other), now);

        assert!(outcome.is_new);
        assert_eq!(outcome.decision, MergeDecision::Inserted);
    }

    #[test]
    fn url_change_resets_liveness_for_probing() {
        let mut corpus = JobCorpus::default();
        let now = Utc::now();

        let outcome = corpus.merge_posting(draft(&aggregator_raw()), now);
        corpus.jobs[0].liveness = LivenessStatus::Active;
        corpus.jobs[0].next_probe_at = Some(now + chrono::Duration::days(3));

        let mut moved = aggregator_raw();
        moved.url = "https://jobhub.example.com/jh-1-reposted".into();
        corpus.merge_posting(draft(&moved), now);

        let job = corpus.get(&outcome.canonical_id).unwrap();
        assert_eq!(job.liveness, LivenessStatus::Unknown);
        assert_eq!(job.next_probe_at, Some(now));
    }

    #[test]
    fn routine_reingest_does_not_touch_liveness() {
        let mut corpus = JobCorpus::default();
        let now = Utc::now();

        corpus.merge_posting(draft(&aggregator_raw()), now);
        corpus.jobs[0].liveness = LivenessStatus::Active;

        corpus.merge_posting(draft(&aggregator_raw()), now);
        assert_eq!(corpus.jobs[0].liveness, LivenessStatus::Active);
    }
}
