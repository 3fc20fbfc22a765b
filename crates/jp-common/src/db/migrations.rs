use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::{DbPoolError, PgPool};
use crate::schema;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migration: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to build pool: {0}")]
    PoolBuild(#[from] DbPoolError),
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "canonical jobs table",
        sql: schema::JOBS_DDL,
    },
    Migration {
        id: 2,
        description: "job lineage",
        sql: schema::JOB_LINEAGE_DDL,
    },
    Migration {
        id: 3,
        description: "ingestion runs + corpus version",
        sql: schema::INGESTION_RUNS_DDL,
    },
    Migration {
        id: 4,
        description: "internal postings board",
        sql: schema::INTERNAL_POSTINGS_DDL,
    },
    Migration {
        id: 5,
        description: "per-source probe health",
        sql: schema::SOURCE_HEALTH_DDL,
    },
    Migration {
        id: 6,
        description: "candidate profile snapshots",
        sql: schema::CANDIDATE_PROFILES_DDL,
    },
    Migration {
        id: 7,
        description: "candidate job actions",
        sql: schema::CANDIDATE_ACTIONS_DDL,
    },
];

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let mut client = pool.get().await?;
    client
        .batch_execute(
            "CREATE SCHEMA IF NOT EXISTS jp;
             CREATE TABLE IF NOT EXISTS jp.schema_migrations (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             );",
        )
        .await?;

    for migration in MIGRATIONS {
        let already_applied: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM jp.schema_migrations WHERE id = $1)",
                &[&migration.id],
            )
            .await?
            .get(0);

        if already_applied {
            continue;
        }

        let tx = client.transaction().await?;
        tx.batch_execute(migration.sql).await?;
        tx.execute(
            "INSERT INTO jp.schema_migrations (id, description) VALUES ($1, $2)",
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}
