//! Process-level run ID.
//!
//! Each process gets one ULID at startup; every ingestion batch and probe
//! cycle in that process logs and records the same ID. ULIDs sort by creation
//! time, which keeps `ingestion_runs` browsable in insertion order.

use once_cell::sync::Lazy;
use ulid::Ulid;

static RUN_ID: Lazy<String> = Lazy::new(|| Ulid::new().to_string());

/// Returns the process-level run ID (26 chars, URL-safe, time-ordered).
#[inline]
pub fn get() -> &'static str {
    &RUN_ID
}

/// Generates a fresh ULID for sub-operations (per-batch ids, request ids).
#[inline]
pub fn generate() -> String {
    Ulid::new().to_string()
}
