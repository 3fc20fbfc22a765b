use deadpool_postgres::PoolError;
use serde_json::Value;
use tokio_postgres::Error as PgError;
use tracing::instrument;

use crate::db::PgPool;
use crate::feed::CorpusVersion;

#[derive(Debug, thiserror::Error)]
pub enum RunStorageError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("unknown ingestion run: {0}")]
    UnknownRun(String),
}

/// Totals for one completed batch, recorded on the run row.
#[derive(Debug, Clone, Default)]
pub struct RunCounts {
    pub fetched: i32,
    pub inserted: i32,
    pub updated: i32,
    pub absorbed: i32,
    pub skipped: i32,
    pub source_counts: Value,
}

#[instrument(skip(pool))]
pub async fn begin_run(pool: &PgPool, run_id: &str) -> Result<(), RunStorageError> {
    let client = pool.get().await?;
    client
        .execute(
            "INSERT INTO jp.ingestion_runs (run_id) VALUES ($1) ON CONFLICT (run_id) DO NOTHING",
            &[&run_id],
        )
        .await?;
    Ok(())
}

/// Marks the run complete and assigns the next corpus version in the same
/// transaction, so two finishing batches can never share a version.
#[instrument(skip(pool, counts))]
pub async fn complete_run(
    pool: &PgPool,
    run_id: &str,
    counts: &RunCounts,
) -> Result<CorpusVersion, RunStorageError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let row = tx
        .query_opt(
            "UPDATE jp.ingestion_runs SET \
                corpus_version = (\
                    SELECT COALESCE(MAX(corpus_version), 0) + 1 FROM jp.ingestion_runs\
                ), \
                completed_at = NOW(), \
                source_counts = $2, \
                postings_fetched = $3, \
                postings_inserted = $4, \
                postings_updated = $5, \
                postings_absorbed = $6, \
                postings_skipped = $7 \
             WHERE run_id = $1 \
             RETURNING corpus_version",
            &[
                &run_id,
                &counts.source_counts,
                &counts.fetched,
                &counts.inserted,
                &counts.updated,
                &counts.absorbed,
                &counts.skipped,
            ],
        )
        .await?;

    let version = row
        .ok_or_else(|| RunStorageError::UnknownRun(run_id.to_string()))?
        .get::<_, Option<i64>>("corpus_version")
        .unwrap_or(0);

    tx.commit().await?;
    Ok(version)
}

/// Version of the last completed batch; 0 before the first one finishes.
#[instrument(skip(pool))]
pub async fn current_corpus_version(pool: &PgPool) -> Result<CorpusVersion, RunStorageError> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "SELECT COALESCE(MAX(corpus_version), 0) AS version FROM jp.ingestion_runs",
            &[],
        )
        .await?;
    Ok(row.get("version"))
}
