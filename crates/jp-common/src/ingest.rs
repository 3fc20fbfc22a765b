use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};
use ulid::Ulid;

use crate::db::{self, PgPool, RunCounts};
use crate::dedup::{JobCorpus, MergeDecision};
use crate::feed::CorpusVersion;
use crate::source::SourceAdapter;
use crate::{JobSource, RawPosting, canonical};

/// Outer bound on one adapter's whole fetch phase. Individual requests
/// already time out; this caps a source that pages forever or crawls a
/// huge listing, so the batch still commits everyone else's results.
const ADAPTER_FETCH_DEADLINE_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Storage(#[from] db::JobStorageError),
    #[error(transparent)]
    Run(#[from] db::RunStorageError),
    #[error(transparent)]
    Health(#[from] db::SourceHealthError),
}

/// Per-source outcome of the fetch phase. A failed source is reported, not
/// fatal; the batch commits whatever the other sources produced.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchCounts {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub absorbed: usize,
    pub ambiguous: usize,
    pub skipped: usize,
}

impl BatchCounts {
    fn record(&mut self, decision: &MergeDecision) {
        match decision {
            MergeDecision::Inserted => self.inserted += 1,
            MergeDecision::UpdatedInPlace => self.updated += 1,
            MergeDecision::AbsorbedAsLineage { .. } => self.absorbed += 1,
            MergeDecision::AmbiguousStandalone { .. } => {
                self.ambiguous += 1;
                self.inserted += 1;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub run_id: String,
    pub corpus_version: CorpusVersion,
    pub counts: BatchCounts,
    pub sources: Vec<SourceReport>,
}

fn source_counts_json(reports: &[SourceReport]) -> Value {
    let mut map = serde_json::Map::new();
    for report in reports {
        map.insert(
            report.source.clone(),
            json!({ "fetched": report.fetched, "error": report.error }),
        );
    }
    Value::Object(map)
}

/// Runs registered adapters concurrently, canonicalizes and merges their
/// output in discovery order, persists touched rows, and bumps the corpus
/// version. Re-running the same batch is idempotent.
pub struct Ingestor {
    pool: PgPool,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    us_only: bool,
}

impl Ingestor {
    pub fn new(pool: PgPool, us_only: bool) -> Self {
        Self {
            pool,
            adapters: Vec::new(),
            us_only,
        }
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.push(adapter);
    }

    pub fn sources(&self) -> Vec<String> {
        self.adapters
            .iter()
            .map(|a| a.source().name().to_string())
            .collect()
    }

    /// One batch over every registered adapter.
    #[instrument(skip(self))]
    pub async fn run_batch(&self) -> Result<BatchSummary, IngestError> {
        self.run_batch_for(None).await
    }

    /// One batch over a single source, as the ingest endpoint triggers it.
    /// `None` runs every adapter.
    #[instrument(skip(self))]
    pub async fn run_batch_for(
        &self,
        source_name: Option<&str>,
    ) -> Result<BatchSummary, IngestError> {
        let run_id = Ulid::new().to_string();
        db::begin_run(&self.pool, &run_id).await?;

        let (batches, sources) = self.fetch_all(source_name).await;

        let mut counts = BatchCounts {
            fetched: batches.iter().map(|b| b.len()).sum(),
            ..BatchCounts::default()
        };

        let source_rates = self.load_source_rates().await?;
        let mut corpus = JobCorpus::from_jobs(db::load_corpus(&self.pool).await?);
        let mut touched = BTreeSet::new();
        let now = Utc::now();

        for posting in batches.into_iter().flatten() {
            let mut draft = match canonical::canonicalize_posting(&posting, self.us_only) {
                Ok(draft) => draft,
                Err(e) => {
                    counts.skipped += 1;
                    warn!(url = %posting.url, error = %e, "skipping malformed posting");
                    continue;
                }
            };
            draft.trust_score = canonical::adjusted_trust(
                draft.trust_score,
                source_rates.get(&draft.source).copied(),
            );

            let outcome = corpus.merge_posting(draft, now);
            counts.record(&outcome.decision);
            touched.insert(outcome.canonical_id);
        }

        for canonical_id in &touched {
            if let Some(job) = corpus.get(canonical_id) {
                db::persist_job(&self.pool, job).await?;
            }
        }

        let corpus_version = db::complete_run(
            &self.pool,
            &run_id,
            &RunCounts {
                fetched: counts.fetched as i32,
                inserted: counts.inserted as i32,
                updated: counts.updated as i32,
                absorbed: counts.absorbed as i32,
                skipped: counts.skipped as i32,
                source_counts: source_counts_json(&sources),
            },
        )
        .await?;

        metrics::counter!("jp_ingest_postings_fetched_total").increment(counts.fetched as u64);
        metrics::counter!("jp_ingest_postings_inserted_total").increment(counts.inserted as u64);
        metrics::counter!("jp_ingest_postings_absorbed_total").increment(counts.absorbed as u64);
        metrics::counter!("jp_ingest_postings_skipped_total").increment(counts.skipped as u64);

        info!(
            run_id,
            corpus_version,
            fetched = counts.fetched,
            inserted = counts.inserted,
            updated = counts.updated,
            absorbed = counts.absorbed,
            ambiguous = counts.ambiguous,
            skipped = counts.skipped,
            "completed ingestion batch"
        );

        Ok(BatchSummary {
            run_id,
            corpus_version,
            counts,
            sources,
        })
    }

    /// Current probe success rate per registered source, read once per
    /// batch. Sources with no probe history are simply absent.
    async fn load_source_rates(&self) -> Result<HashMap<JobSource, f64>, IngestError> {
        let mut rates = HashMap::new();
        for adapter in &self.adapters {
            let source = adapter.source();
            if let Some(rate) = db::fetch_success_rate(&self.pool, &source).await? {
                rates.insert(source, rate);
            }
        }
        Ok(rates)
    }

    /// Fetch phase: every selected adapter runs as its own task under a
    /// shared deadline. A failing, hanging or panicking adapter yields an
    /// error report and an empty batch.
    async fn fetch_all(
        &self,
        source_name: Option<&str>,
    ) -> (Vec<Vec<RawPosting>>, Vec<SourceReport>) {
        let deadline = tokio::time::Duration::from_secs(ADAPTER_FETCH_DEADLINE_SECS);

        let mut handles = Vec::new();
        for adapter in &self.adapters {
            let name = adapter.source().name().to_string();
            if let Some(wanted) = source_name {
                if name != wanted {
                    continue;
                }
            }
            let adapter = Arc::clone(adapter);
            handles.push((name, tokio::spawn(async move { adapter.fetch().await })));
        }

        let mut batches = Vec::new();
        let mut reports = Vec::new();
        for (source, handle) in handles {
            let abort = handle.abort_handle();
            match tokio::time::timeout(deadline, handle).await {
                Ok(Ok(Ok(postings))) => {
                    reports.push(SourceReport {
                        source,
                        fetched: postings.len(),
                        error: None,
                    });
                    batches.push(postings);
                }
                Ok(Ok(Err(e))) => {
                    warn!(source, error = %e, "source fetch failed");
                    reports.push(SourceReport {
                        source,
                        fetched: 0,
                        error: Some(e.to_string()),
                    });
                    batches.push(vec![]);
                }
                Ok(Err(e)) => {
                    warn!(source, error = %e, "source fetch task panicked");
                    reports.push(SourceReport {
                        source,
                        fetched: 0,
                        error: Some(format!("task failure: {e}")),
                    });
                    batches.push(vec![]);
                }
                Err(_) => {
                    abort.abort();
                    warn!(source, "source fetch exceeded the batch deadline");
                    reports.push(SourceReport {
                        source,
                        fetched: 0,
                        error: Some("fetch deadline exceeded".into()),
                    });
                    batches.push(vec![]);
                }
            }
        }
        (batches, reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_fold_every_merge_decision() {
        let mut counts = BatchCounts::default();
        counts.record(&MergeDecision::Inserted);
        counts.record(&MergeDecision::UpdatedInPlace);
        counts.record(&MergeDecision::AbsorbedAsLineage { similarity: 0.95 });
        counts.record(&MergeDecision::AmbiguousStandalone { similarity: 0.8 });

        assert_eq!(counts.inserted, 2);
        assert_eq!(counts.updated, 1);
        assert_eq!(counts.absorbed, 1);
        assert_eq!(counts.ambiguous, 1);
    }

    #[test]
    fn source_counts_json_keys_by_source_name() {
        let reports = vec![
            SourceReport {
                source: "jobhub".into(),
                fetched: 12,
                error: None,
            },
            SourceReport {
                source: "acme".into(),
                fetched: 0,
                error: Some("http request failed".into()),
            },
        ];

        let value = source_counts_json(&reports);
        assert_eq!(value["jobhub"]["fetched"], 12);
        assert!(value["jobhub"]["error"].is_null());
        assert_eq!(value["acme"]["error"], "http request failed");
    }
}
