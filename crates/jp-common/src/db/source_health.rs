use deadpool_postgres::PoolError;
use tokio_postgres::Error as PgError;
use tracing::instrument;

use crate::JobSource;
use crate::db::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum SourceHealthError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
}

/// Folds one probe outcome into the source's counters and returns the new
/// success rate.
#[instrument(skip(pool), fields(source = %source.name()))]
pub async fn record_probe_outcome(
    pool: &PgPool,
    source: &JobSource,
    success: bool,
) -> Result<f64, SourceHealthError> {
    let client = pool.get().await?;
    let (succ, fail): (i64, i64) = if success { (1, 0) } else { (0, 1) };

    let row = client
        .query_one(
            "INSERT INTO jp.source_health (source_kind, source_name, successes, failures, \
                                           success_rate, updated_at) \
             VALUES ($1, $2, $3, $4, $3::float / ($3 + $4), NOW()) \
             ON CONFLICT (source_kind, source_name) DO UPDATE SET \
                successes = jp.source_health.successes + EXCLUDED.successes, \
                failures = jp.source_health.failures + EXCLUDED.failures, \
                success_rate = (jp.source_health.successes + EXCLUDED.successes)::float \
                    / (jp.source_health.successes + EXCLUDED.successes \
                       + jp.source_health.failures + EXCLUDED.failures), \
                updated_at = NOW() \
             RETURNING success_rate",
            &[&source.kind().to_string(), &source.name(), &succ, &fail],
        )
        .await?;

    Ok(row.get::<_, Option<f64>>("success_rate").unwrap_or(1.0))
}

/// `None` until the source has at least one recorded probe.
#[instrument(skip(pool), fields(source = %source.name()))]
pub async fn fetch_success_rate(
    pool: &PgPool,
    source: &JobSource,
) -> Result<Option<f64>, SourceHealthError> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT success_rate FROM jp.source_health \
             WHERE source_kind = $1 AND source_name = $2",
            &[&source.kind().to_string(), &source.name()],
        )
        .await?;

    Ok(row.and_then(|r| r.get("success_rate")))
}
