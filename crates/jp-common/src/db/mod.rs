pub mod candidates;
pub mod ingestion_runs;
pub mod jobs;
pub mod migrations;
pub mod pool;
pub mod source_health;

// Keep re-exports unique so downstream crates see a single symbol per helper.
pub use candidates::{CandidateActions, CandidateFetchError, fetch_actions, fetch_profile};
pub use ingestion_runs::{
    RunCounts, RunStorageError, begin_run, complete_run, current_corpus_version,
};
pub use jobs::{
    JobStorageError, apply_probe_outcome, fetch_due_probes, fetch_feed_jobs, fetch_job,
    load_corpus, persist_job,
};
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPoolError, PgPool, create_pool_from_url};
pub use source_health::{SourceHealthError, fetch_success_rate, record_probe_outcome};
