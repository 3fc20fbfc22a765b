use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::Parser;
use dotenvy::dotenv;
use jp_common::canonical::{adjusted_trust, baseline_trust};
use jp_common::db::{
    DbPoolError, JobStorageError, MigrationError, PgPool, SourceHealthError, apply_probe_outcome,
    create_pool_from_url, fetch_due_probes, record_probe_outcome, run_migrations,
};
use jp_common::liveness::{
    MAX_PROBE_ATTEMPTS, ProbeError, ProbeQueue, ProbeResolution, ProbeSignal, ProbeTask,
    RollingHealth, classify_response, next_probe_interval,
};
use jp_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};
use jp_common::source::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_REQUEST_DELAY_SECS};
use jp_common::{Job, LivenessStatus};
use tokio::time::{Duration, interval, sleep};
use tracing::{debug, info, warn};

/// Rendered text width for closed-phrase scanning. Narrow enough to keep
/// rendering cheap; the phrases are short.
const PROBE_TEXT_WIDTH: usize = 120;

/// Rolling-window alert bounds for a source that keeps serving dead postings.
const HEALTH_WARN_THRESHOLD: f64 = 0.5;
const HEALTH_WARN_MIN_SAMPLES: usize = 10;

#[derive(Debug, Parser)]
#[command(
    name = "jp-prober",
    about = "Verify liveness of tracked job postings on their probe schedule"
)]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    db_url: String,

    /// Seconds between probe cycles
    #[arg(long, env = "JP_PROBE_INTERVAL_SECONDS", default_value_t = 300)]
    poll_interval: u64,

    /// Maximum postings probed per cycle
    #[arg(long, env = "JP_PROBE_BATCH_SIZE", default_value_t = 50)]
    batch_size: i64,

    /// Politeness delay between probe requests, in seconds
    #[arg(
        long,
        env = "JP_PROBE_REQUEST_DELAY_SECONDS",
        default_value_t = DEFAULT_REQUEST_DELAY_SECS
    )]
    request_delay: u64,
}

#[derive(Debug, thiserror::Error)]
enum ProberError {
    #[error("database pool error: {0}")]
    DbPool(#[from] DbPoolError),
    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("job storage error: {0}")]
    Storage(#[from] JobStorageError),
    #[error("source health error: {0}")]
    Health(#[from] SourceHealthError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// What one HTTP probe observed, held until the queue drains the task.
enum ProbeOutcome {
    Classified(ProbeSignal),
    Retryable {
        message: String,
        retry_after: Option<ChronoDuration>,
    },
    Dead {
        message: String,
    },
}

fn outcome_result(outcome: Option<&ProbeOutcome>) -> Result<ProbeSignal, ProbeError> {
    match outcome {
        Some(ProbeOutcome::Classified(signal)) => Ok(signal.clone()),
        Some(ProbeOutcome::Retryable {
            message,
            retry_after,
        }) => Err(ProbeError::Retryable {
            message: message.clone(),
            retry_after: *retry_after,
        }),
        Some(ProbeOutcome::Dead { message }) => Err(ProbeError::Dead {
            message: message.clone(),
        }),
        None => Err(ProbeError::Dead {
            message: "no probe outcome recorded".into(),
        }),
    }
}

/// Failure accounting for a posting the probe could not reach. Under the
/// attempt cap the next probe comes back quickly on an exponential ladder;
/// at the cap the counter resets and the regular cadence resumes. The
/// posting's status is untouched either way.
fn reschedule_unreachable(
    prior_failures: u32,
    trust_score: u8,
    age_days: i64,
    now: DateTime<Utc>,
) -> (u32, DateTime<Utc>) {
    let failures = prior_failures + 1;
    if failures >= MAX_PROBE_ATTEMPTS {
        (0, now + next_probe_interval(trust_score, age_days))
    } else {
        (failures, now + ChronoDuration::minutes(1 << failures.min(6)))
    }
}

struct Prober {
    pool: PgPool,
    client: reqwest::Client,
    request_delay: Duration,
    batch_size: i64,
    health: HashMap<String, RollingHealth>,
}

impl Prober {
    /// One GET against the posting URL. reqwest follows redirects, so the
    /// response URL is the final landing spot the classifier compares
    /// against the original.
    async fn probe_url(&self, url: &str) -> ProbeOutcome {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) if err.is_builder() => {
                return ProbeOutcome::Dead {
                    message: format!("request build failed: {err}"),
                };
            }
            Err(err) => {
                return ProbeOutcome::Retryable {
                    message: err.to_string(),
                    retry_after: None,
                };
            }
        };

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<i64>().ok())
                .map(ChronoDuration::seconds);
            return ProbeOutcome::Retryable {
                message: format!("upstream answered {status}"),
                retry_after,
            };
        }

        let final_url = response.url().to_string();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                return ProbeOutcome::Retryable {
                    message: format!("body read failed: {err}"),
                    retry_after: None,
                };
            }
        };

        // Closed phrases hide inside markup; render to text before scanning.
        // Non-HTML bodies pass through unchanged.
        let body_text = html2text::from_read(body.as_bytes(), PROBE_TEXT_WIDTH).unwrap_or(body);

        ProbeOutcome::Classified(classify_response(
            status.as_u16(),
            url,
            &final_url,
            &body_text,
        ))
    }

    async fn probe_cycle(&mut self, worker_id: &str) -> Result<usize, ProberError> {
        let now = Utc::now();
        let due = fetch_due_probes(&self.pool, now, self.batch_size).await?;
        if due.is_empty() {
            debug!("no probes due");
            return Ok(0);
        }
        info!(due = due.len(), "starting probe cycle");

        let mut outcomes: HashMap<String, ProbeOutcome> = HashMap::new();
        for (index, job) in due.iter().enumerate() {
            if index > 0 {
                sleep(self.request_delay).await;
            }
            let outcome = self.probe_url(&job.url).await;
            outcomes.insert(job.canonical_id.clone(), outcome);
        }

        let mut queue = ProbeQueue::default();
        for job in &due {
            queue.enqueue(ProbeTask::new(
                &job.canonical_id,
                &job.url,
                job.trust_score,
                job.liveness,
            ));
        }

        // Each task is attempted once per cycle; a retryable failure parks
        // the task with a future attempt time and the loop moves on.
        while queue
            .process_next_with_worker(worker_id, |task| {
                outcome_result(outcomes.get(&task.canonical_id))
            })
            .is_some()
        {}

        let jobs_by_id: HashMap<&str, &Job> = due
            .iter()
            .map(|job| (job.canonical_id.as_str(), job))
            .collect();

        let mut verified = 0usize;
        for task in &queue.tasks {
            let Some(job) = jobs_by_id.get(task.canonical_id.as_str()).copied() else {
                continue;
            };
            let age_days = (now - job.first_seen_at).num_days();

            match &task.resolution {
                Some(ProbeResolution::Verified { signal, new_status }) => {
                    self.persist_verified(job, signal, *new_status, age_days, now)
                        .await?;
                    verified += 1;
                }
                Some(ProbeResolution::GaveUp { message }) => {
                    self.persist_unreachable(job, message, age_days, now).await?;
                }
                None => {
                    let message = task
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "probe did not resolve".into());
                    self.persist_unreachable(job, &message, age_days, now)
                        .await?;
                }
            }
        }

        info!(probed = due.len(), verified, "probe cycle complete");
        Ok(due.len())
    }

    async fn persist_verified(
        &mut self,
        job: &Job,
        signal: &ProbeSignal,
        new_status: LivenessStatus,
        age_days: i64,
        now: DateTime<Utc>,
    ) -> Result<(), ProberError> {
        let still_active = new_status == LivenessStatus::Active;

        let rate = record_probe_outcome(&self.pool, &job.source, still_active).await?;
        let trust = adjusted_trust(baseline_trust(&job.source), Some(rate));
        let next_probe_at = now + next_probe_interval(trust, age_days);

        apply_probe_outcome(
            &self.pool,
            &job.canonical_id,
            new_status,
            Some(now),
            Some(next_probe_at),
            0,
            trust,
        )
        .await?;

        metrics::counter!("jp_probe_verified_total").increment(1);
        if !still_active {
            metrics::counter!("jp_probe_stale_total").increment(1);
        }

        let health = self.health.entry(job.source.name().to_string()).or_default();
        health.record(still_active);
        if let Some(window_rate) = health.success_rate() {
            if health.sample_count() >= HEALTH_WARN_MIN_SAMPLES
                && window_rate < HEALTH_WARN_THRESHOLD
            {
                warn!(
                    source = job.source.name(),
                    success_rate = window_rate,
                    samples = health.sample_count(),
                    "source keeps serving dead postings"
                );
            }
        }

        debug!(
            canonical_id = %job.canonical_id,
            signal = signal.as_str(),
            status = %new_status,
            trust,
            "probe verified"
        );
        Ok(())
    }

    async fn persist_unreachable(
        &mut self,
        job: &Job,
        message: &str,
        age_days: i64,
        now: DateTime<Utc>,
    ) -> Result<(), ProberError> {
        let (probe_failures, next_probe_at) =
            reschedule_unreachable(job.probe_failures, job.trust_score, age_days, now);

        // A network failure says nothing about the posting: status, trust
        // and source health all stay as they were.
        apply_probe_outcome(
            &self.pool,
            &job.canonical_id,
            job.liveness,
            None,
            Some(next_probe_at),
            probe_failures,
            job.trust_score,
        )
        .await?;

        metrics::counter!("jp_probe_unreachable_total").increment(1);
        debug!(
            canonical_id = %job.canonical_id,
            failures = probe_failures,
            error = message,
            "probe failed to reach posting"
        );
        Ok(())
    }
}

async fn run() -> Result<(), ProberError> {
    dotenv().ok();
    init_tracing_subscriber("jp-prober");
    install_tracing_panic_hook("jp-prober");
    jp_metrics::init_metrics("JP_PROBER_METRICS_PORT", 9188);

    let cli = Cli::parse();
    let pool = create_pool_from_url(&cli.db_url)?;
    run_migrations(&pool).await?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
        .build()?;

    let mut prober = Prober {
        pool,
        client,
        request_delay: Duration::from_secs(cli.request_delay),
        batch_size: cli.batch_size.max(1),
        health: HashMap::new(),
    };

    let worker_id = format!("jp-prober-{}", jp_common::run_id::get());
    info!(
        worker_id = %worker_id,
        poll_interval = cli.poll_interval,
        batch_size = prober.batch_size,
        "starting prober"
    );

    let mut ticker = interval(Duration::from_secs(cli.poll_interval.max(1)));

    loop {
        ticker.tick().await;

        if let Err(err) = prober.probe_cycle(&worker_id).await {
            warn!(error = %err, "probe cycle failed");
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("jp-prober failed: {err}");
        std::process::exit(1);
    }
}
