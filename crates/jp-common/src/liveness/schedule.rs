use chrono::Duration;

/// Probe cadence bounds. Every tracked posting is revisited at least once
/// a week and at most once a day.
pub const MIN_PROBE_INTERVAL_DAYS: i64 = 1;
pub const MAX_PROBE_INTERVAL_DAYS: i64 = 7;

const BASE_INTERVAL_HOURS: f64 = (MAX_PROBE_INTERVAL_DAYS * 24) as f64;

/// When the next probe is due, relative to now. Higher-trust sources get
/// probed more often (their postings anchor merges and badges), and older
/// postings get probed more often (staleness risk grows with age).
pub fn next_probe_interval(trust_score: u8, age_days: i64) -> Duration {
    let trust = trust_score.min(100) as f64;
    let trust_factor = 0.5 + trust / 100.0;

    let age = age_days.max(0) as f64;
    let age_factor = (1.0 + age / 30.0).min(5.0);

    let hours = BASE_INTERVAL_HOURS / (trust_factor * age_factor);
    let clamped = hours.clamp(
        (MIN_PROBE_INTERVAL_DAYS * 24) as f64,
        (MAX_PROBE_INTERVAL_DAYS * 24) as f64,
    );
    Duration::hours(clamped.round() as i64)
}
