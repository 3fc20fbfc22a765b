use std::collections::HashMap;

use chrono::{DateTime, Utc};
use deadpool_postgres::PoolError;
use serde_json::Value;
use tokio_postgres::Error as PgError;
use tokio_postgres::Row;
use tracing::instrument;

use crate::db::PgPool;
use crate::{
    CanonicalCompany, Job, JobSource, LineageEntry, LivenessStatus, Location, SalaryRange,
    SourceKind,
};

#[derive(Debug, thiserror::Error)]
pub enum JobStorageError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map job row: {0}")]
    Mapping(String),
}

const JOB_COLUMNS: &str = "canonical_id, source_kind, source_name, source_id, \
    title, company_id, company_name, \
    location_city, location_region, location_country, latitude, longitude, location_raw, \
    description, skills, seniority, work_type, salary_min, salary_max, salary_currency, url, \
    trust_score, liveness, first_seen_at, last_verified_at, posted_at, next_probe_at, \
    probe_failures, out_of_scope";

fn parse_source(kind: &str, name: &str) -> Result<JobSource, JobStorageError> {
    let kind: SourceKind = kind
        .parse()
        .map_err(|_| JobStorageError::Mapping(format!("unknown source kind: {kind}")))?;
    Ok(JobSource::from_parts(kind, name))
}

fn parse_skills(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        _ => vec![],
    }
}

fn skills_to_value(skills: &[String]) -> Value {
    Value::Array(skills.iter().map(|s| Value::String(s.clone())).collect())
}

fn job_from_row(row: &Row) -> Result<Job, JobStorageError> {
    let source = parse_source(
        row.get::<_, &str>("source_kind"),
        row.get::<_, &str>("source_name"),
    )?;
    let liveness: LivenessStatus = row
        .get::<_, &str>("liveness")
        .parse()
        .map_err(|_| JobStorageError::Mapping("unknown liveness status".into()))?;

    let salary_min: Option<i32> = row.get("salary_min");
    let salary_max: Option<i32> = row.get("salary_max");
    let salary_currency: Option<String> = row.get("salary_currency");
    let salary = if salary_min.is_some() || salary_max.is_some() || salary_currency.is_some() {
        Some(SalaryRange {
            min: salary_min.map(|v| v.max(0) as u32),
            max: salary_max.map(|v| v.max(0) as u32),
            currency: salary_currency,
        })
    } else {
        None
    };

    Ok(Job {
        canonical_id: row.get("canonical_id"),
        source,
        source_id: row.get("source_id"),
        title: row.get("title"),
        company: CanonicalCompany {
            id: row.get("company_id"),
            name: row.get("company_name"),
        },
        location: Location {
            city: row.get("location_city"),
            region: row.get("location_region"),
            country: row.get("location_country"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            raw: row.get("location_raw"),
        },
        description: row.get("description"),
        skills: parse_skills(row.get("skills")),
        seniority: row
            .get::<_, Option<String>>("seniority")
            .and_then(|s| s.parse().ok()),
        work_type: row
            .get::<_, Option<String>>("work_type")
            .and_then(|s| s.parse().ok()),
        salary,
        url: row.get("url"),
        trust_score: row.get::<_, i32>("trust_score").clamp(0, 100) as u8,
        liveness,
        first_seen_at: row.get("first_seen_at"),
        last_verified_at: row.get("last_verified_at"),
        posted_at: row.get("posted_at"),
        next_probe_at: row.get("next_probe_at"),
        probe_failures: row.get::<_, i32>("probe_failures").max(0) as u32,
        out_of_scope: row.get("out_of_scope"),
        lineage: vec![],
    })
}

fn lineage_from_row(row: &Row) -> Result<(String, LineageEntry), JobStorageError> {
    let source = parse_source(
        row.get::<_, &str>("source_kind"),
        row.get::<_, &str>("source_name"),
    )?;
    Ok((
        row.get("canonical_id"),
        LineageEntry {
            source,
            source_id: row.get("source_id"),
            trust_score: row.get::<_, i32>("trust_score").clamp(0, 100) as u8,
            first_seen_at: row.get("first_seen_at"),
            last_seen_at: row.get("last_seen_at"),
        },
    ))
}

async fn attach_lineage(
    client: &deadpool_postgres::Client,
    jobs: &mut [Job],
) -> Result<(), JobStorageError> {
    if jobs.is_empty() {
        return Ok(());
    }

    let ids: Vec<String> = jobs.iter().map(|j| j.canonical_id.clone()).collect();
    let rows = client
        .query(
            "SELECT canonical_id, source_kind, source_name, source_id, trust_score, \
                    first_seen_at, last_seen_at \
             FROM jp.job_lineage WHERE canonical_id = ANY($1) ORDER BY first_seen_at, id",
            &[&ids],
        )
        .await?;

    let mut by_job: HashMap<String, Vec<LineageEntry>> = HashMap::new();
    for row in &rows {
        let (canonical_id, entry) = lineage_from_row(row)?;
        by_job.entry(canonical_id).or_default().push(entry);
    }

    for job in jobs.iter_mut() {
        if let Some(entries) = by_job.remove(&job.canonical_id) {
            job.lineage = entries;
        }
    }
    Ok(())
}

/// Entire corpus including lineage, as the deduplicator needs it.
#[instrument(skip(pool))]
pub async fn load_corpus(pool: &PgPool) -> Result<Vec<Job>, JobStorageError> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!("SELECT {JOB_COLUMNS} FROM jp.jobs ORDER BY first_seen_at, canonical_id"),
            &[],
        )
        .await?;

    let mut jobs = rows
        .iter()
        .map(job_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    attach_lineage(&client, &mut jobs).await?;
    Ok(jobs)
}

#[instrument(skip(pool))]
pub async fn fetch_job(pool: &PgPool, canonical_id: &str) -> Result<Option<Job>, JobStorageError> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("SELECT {JOB_COLUMNS} FROM jp.jobs WHERE canonical_id = $1"),
            &[&canonical_id],
        )
        .await?;

    match row {
        Some(row) => {
            let mut jobs = vec![job_from_row(&row)?];
            attach_lineage(&client, &mut jobs).await?;
            Ok(jobs.pop())
        }
        None => Ok(None),
    }
}

/// Candidate rows for feed ranking. Stale and out-of-scope jobs never make
/// a feed, so they are filtered here instead of shipped to the engine.
#[instrument(skip(pool))]
pub async fn fetch_feed_jobs(pool: &PgPool) -> Result<Vec<Job>, JobStorageError> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!(
                "SELECT {JOB_COLUMNS} FROM jp.jobs \
                 WHERE NOT out_of_scope AND liveness <> 'stale' \
                 ORDER BY posted_at DESC NULLS LAST, canonical_id"
            ),
            &[],
        )
        .await?;

    let mut jobs = rows
        .iter()
        .map(job_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    attach_lineage(&client, &mut jobs).await?;
    Ok(jobs)
}

/// Jobs whose probe is due, oldest schedule first.
#[instrument(skip(pool))]
pub async fn fetch_due_probes(
    pool: &PgPool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Job>, JobStorageError> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!(
                "SELECT {JOB_COLUMNS} FROM jp.jobs \
                 WHERE next_probe_at IS NOT NULL AND next_probe_at <= $1 \
                 ORDER BY next_probe_at, canonical_id LIMIT $2"
            ),
            &[&now, &limit],
        )
        .await?;

    rows.iter().map(job_from_row).collect()
}

/// Upsert one canonical job and its lineage. The per-job advisory lock
/// serializes this against a concurrent probe update for the same row.
#[instrument(skip(pool, job), fields(canonical_id = %job.canonical_id))]
pub async fn persist_job(pool: &PgPool, job: &Job) -> Result<(), JobStorageError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    tx.execute(
        "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))",
        &[&job.canonical_id],
    )
    .await?;

    let normalized_title = crate::canonical::normalize_title(&job.title);
    tx.execute(
        "INSERT INTO jp.jobs (\
            canonical_id, source_kind, source_name, source_id, \
            title, normalized_title, company_id, company_name, \
            location_city, location_region, location_country, latitude, longitude, location_raw, \
            description, skills, seniority, work_type, salary_min, salary_max, salary_currency, url, \
            trust_score, liveness, first_seen_at, last_verified_at, posted_at, next_probe_at, \
            probe_failures, out_of_scope, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
                 $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, NOW()) \
         ON CONFLICT (canonical_id) DO UPDATE SET \
            source_kind = EXCLUDED.source_kind, \
            source_name = EXCLUDED.source_name, \
            source_id = EXCLUDED.source_id, \
            title = EXCLUDED.title, \
            normalized_title = EXCLUDED.normalized_title, \
            company_id = EXCLUDED.company_id, \
            company_name = EXCLUDED.company_name, \
            location_city = EXCLUDED.location_city, \
            location_region = EXCLUDED.location_region, \
            location_country = EXCLUDED.location_country, \
            latitude = EXCLUDED.latitude, \
            longitude = EXCLUDED.longitude, \
            location_raw = EXCLUDED.location_raw, \
            description = EXCLUDED.description, \
            skills = EXCLUDED.skills, \
            seniority = EXCLUDED.seniority, \
            work_type = EXCLUDED.work_type, \
            salary_min = EXCLUDED.salary_min, \
            salary_max = EXCLUDED.salary_max, \
            salary_currency = EXCLUDED.salary_currency, \
            url = EXCLUDED.url, \
            trust_score = EXCLUDED.trust_score, \
            liveness = EXCLUDED.liveness, \
            last_verified_at = EXCLUDED.last_verified_at, \
            posted_at = EXCLUDED.posted_at, \
            next_probe_at = EXCLUDED.next_probe_at, \
            probe_failures = EXCLUDED.probe_failures, \
            out_of_scope = EXCLUDED.out_of_scope, \
            updated_at = NOW()",
        &[
            &job.canonical_id,
            &job.source.kind().to_string(),
            &job.source.name(),
            &job.source_id,
            &job.title,
            &normalized_title,
            &job.company.id,
            &job.company.name,
            &job.location.city,
            &job.location.region,
            &job.location.country,
            &job.location.latitude,
            &job.location.longitude,
            &job.location.raw,
            &job.description,
            &skills_to_value(&job.skills),
            &job.seniority.map(|s| s.to_string()),
            &job.work_type.map(|w| w.to_string()),
            &job.salary.as_ref().and_then(|s| s.min).map(|v| v as i32),
            &job.salary.as_ref().and_then(|s| s.max).map(|v| v as i32),
            &job.salary.as_ref().and_then(|s| s.currency.clone()),
            &job.url,
            &(job.trust_score as i32),
            &job.liveness.to_string(),
            &job.first_seen_at,
            &job.last_verified_at,
            &job.posted_at,
            &job.next_probe_at,
            &(job.probe_failures as i32),
            &job.out_of_scope,
        ],
    )
    .await?;

    for entry in &job.lineage {
        tx.execute(
            "INSERT INTO jp.job_lineage (\
                canonical_id, source_kind, source_name, source_id, trust_score, \
                first_seen_at, last_seen_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (canonical_id, source_kind, source_name, source_id) DO UPDATE SET \
                trust_score = EXCLUDED.trust_score, \
                last_seen_at = EXCLUDED.last_seen_at",
            &[
                &job.canonical_id,
                &entry.source.kind().to_string(),
                &entry.source.name(),
                &entry.source_id,
                &(entry.trust_score as i32),
                &entry.first_seen_at,
                &entry.last_seen_at,
            ],
        )
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Probe-side update. Takes the same advisory lock as `persist_job` so a
/// probe result and a concurrent re-ingestion cannot interleave.
#[instrument(skip(pool))]
pub async fn apply_probe_outcome(
    pool: &PgPool,
    canonical_id: &str,
    liveness: LivenessStatus,
    last_verified_at: Option<DateTime<Utc>>,
    next_probe_at: Option<DateTime<Utc>>,
    probe_failures: u32,
    trust_score: u8,
) -> Result<(), JobStorageError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    tx.execute(
        "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))",
        &[&canonical_id],
    )
    .await?;

    tx.execute(
        "UPDATE jp.jobs SET \
            liveness = $2, \
            last_verified_at = COALESCE($3, last_verified_at), \
            next_probe_at = $4, \
            probe_failures = $5, \
            trust_score = $6, \
            updated_at = NOW() \
         WHERE canonical_id = $1",
        &[
            &canonical_id,
            &liveness.to_string(),
            &last_verified_at,
            &next_probe_at,
            &(probe_failures as i32),
            &(trust_score as i32),
        ],
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skills_round_trip_through_jsonb_value() {
        let skills = vec!["rust".to_string(), "postgresql".to_string()];
        let parsed = parse_skills(skills_to_value(&skills));
        assert_eq!(parsed, skills);
    }

    #[test]
    fn malformed_skills_value_degrades_to_empty() {
        assert!(parse_skills(Value::String("rust".into())).is_empty());
        assert!(parse_skills(Value::Null).is_empty());
    }

    #[test]
    fn source_parsing_round_trips_every_kind() {
        for source in [
            JobSource::Internal,
            JobSource::Company("acme".into()),
            JobSource::Aggregator("jobhub".into()),
        ] {
            let rebuilt = parse_source(&source.kind().to_string(), source.name()).unwrap();
            assert_eq!(rebuilt, source);
        }
    }

    #[test]
    fn unknown_source_kind_is_a_mapping_error() {
        assert!(matches!(
            parse_source("carrier_pigeon", "acme"),
            Err(JobStorageError::Mapping(_))
        ));
    }
}
