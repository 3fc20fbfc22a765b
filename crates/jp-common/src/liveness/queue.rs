use chrono::{DateTime, Duration, Utc};

use crate::LivenessStatus;

use super::signals::ProbeSignal;
use super::state::apply_probe_signal;

/// Attempts per probe cycle before the worker gives up until the next
/// scheduled cycle.
pub const MAX_PROBE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTaskStatus {
    Pending,
    Probing,
    Resolved,
}

/// How a probe cycle ended for one posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResolution {
    /// The URL answered and was classified. `new_status` is what the
    /// posting should transition to.
    Verified {
        signal: ProbeSignal,
        new_status: LivenessStatus,
    },
    /// All attempts failed to reach the URL. The posting keeps its current
    /// status; a network problem says nothing about the posting.
    GaveUp { message: String },
}

pub enum ProbeError {
    Retryable {
        message: String,
        retry_after: Option<Duration>,
    },
    Dead {
        message: String,
    },
}

/// One probe cycle for one canonical posting.
#[derive(Debug, Clone)]
pub struct ProbeTask {
    pub id: u64,
    pub canonical_id: String,
    pub url: String,
    pub trust_score: u8,
    pub current_status: LivenessStatus,
    pub status: ProbeTaskStatus,
    pub attempts: u32,
    pub scheduled_at: DateTime<Utc>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub locked_by: Option<String>,
    pub last_error: Option<String>,
    pub resolution: Option<ProbeResolution>,
    pub created_at: DateTime<Utc>,
    pub probing_started_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ProbeTask {
    pub fn new(
        canonical_id: &str,
        url: &str,
        trust_score: u8,
        current_status: LivenessStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            canonical_id: canonical_id.to_string(),
            url: url.to_string(),
            trust_score,
            current_status,
            status: ProbeTaskStatus::Pending,
            attempts: 0,
            scheduled_at: now,
            next_attempt_at: None,
            locked_by: None,
            last_error: None,
            resolution: None,
            created_at: now,
            probing_started_at: None,
            resolved_at: None,
            updated_at: now,
        }
    }
}

fn backoff_after(attempts: u32) -> Duration {
    // 1, 2, 4 minute ladder.
    let exponent = attempts.saturating_sub(1).min(6);
    Duration::minutes(1 << exponent)
}

/// In-memory probe queue worker. The prober binary drains one task at a
/// time through `process_next_with_worker` and persists the resolution.
#[derive(Default)]
pub struct ProbeQueue {
    pub tasks: Vec<ProbeTask>,
    next_id: u64,
}

impl ProbeQueue {
    pub fn enqueue(&mut self, mut task: ProbeTask) {
        if self.tasks.iter().any(|existing| {
            existing.canonical_id == task.canonical_id
                && existing.status != ProbeTaskStatus::Resolved
        }) {
            return;
        }
        self.next_id += 1;
        task.id = self.next_id;
        self.tasks.push(task);
    }

    fn poll_next(&mut self, now: DateTime<Utc>) -> Option<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| {
                task.status == ProbeTaskStatus::Pending
                    && task.scheduled_at <= now
                    && task.next_attempt_at.map(|ts| ts <= now).unwrap_or(true)
            })
            .min_by(|(_, a), (_, b)| a.scheduled_at.cmp(&b.scheduled_at).then(a.id.cmp(&b.id)))
            .map(|(idx, _)| idx)
    }

    pub fn process_next<F>(&mut self, handler: F) -> Option<ProbeTaskStatus>
    where
        F: Fn(&ProbeTask) -> Result<ProbeSignal, ProbeError>,
    {
        self.process_next_with_worker("worker_stub", handler)
    }

    pub fn process_next_with_worker<F>(
        &mut self,
        worker_id: &str,
        handler: F,
    ) -> Option<ProbeTaskStatus>
    where
        F: Fn(&ProbeTask) -> Result<ProbeSignal, ProbeError>,
    {
        let now = Utc::now();
        let idx = self.poll_next(now)?;
        let mut task = self.tasks[idx].clone();
        task.status = ProbeTaskStatus::Probing;
        task.locked_by = Some(worker_id.to_string());
        task.probing_started_at = Some(now);
        task.updated_at = now;

        // Update the queue before running the handler so external observers
        // can see the pending → probing transition.
        self.tasks[idx] = task.clone();

        match handler(&task) {
            Ok(signal) => {
                let new_status =
                    apply_probe_signal(task.current_status, &signal).unwrap_or(task.current_status);
                task.status = ProbeTaskStatus::Resolved;
                task.resolution = Some(ProbeResolution::Verified { signal, new_status });
                task.last_error = None;
                let finished_at = Utc::now();
                task.resolved_at = Some(finished_at);
                task.updated_at = finished_at;
                task.locked_by = None;
            }
            Err(ProbeError::Dead { message }) => {
                task.status = ProbeTaskStatus::Resolved;
                task.resolution = Some(ProbeResolution::GaveUp {
                    message: message.clone(),
                });
                task.last_error = Some(message);
                let finished_at = Utc::now();
                task.resolved_at = Some(finished_at);
                task.updated_at = finished_at;
                task.locked_by = None;
            }
            Err(ProbeError::Retryable {
                message,
                retry_after,
            }) => {
                task.attempts += 1;
                let finished_at = Utc::now();
                if task.attempts >= MAX_PROBE_ATTEMPTS {
                    task.status = ProbeTaskStatus::Resolved;
                    task.resolution = Some(ProbeResolution::GaveUp {
                        message: message.clone(),
                    });
                    task.resolved_at = Some(finished_at);
                } else {
                    task.status = ProbeTaskStatus::Pending;
                    task.next_attempt_at =
                        Some(finished_at + retry_after.unwrap_or_else(|| backoff_after(task.attempts)));
                    task.resolution = None;
                    task.probing_started_at = None;
                }
                task.last_error = Some(message);
                task.updated_at = finished_at;
                task.locked_by = None;
            }
        }

        self.tasks[idx] = task;
        Some(self.tasks[idx].status)
    }
}
