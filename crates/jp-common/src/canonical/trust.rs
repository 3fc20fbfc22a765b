use crate::JobSource;

/// Baseline trust per source class. Internal postings are ground truth;
/// direct career pages beat aggregators, whose copies lag and go stale.
pub const TRUST_INTERNAL: u8 = 100;
pub const TRUST_COMPANY: u8 = 85;
pub const TRUST_AGGREGATOR: u8 = 60;

/// Maximum adjustment (in either direction) a source's rolling probe
/// success rate can apply to its baseline.
pub const MAX_HEALTH_ADJUSTMENT: i32 = 15;

pub fn baseline_trust(source: &JobSource) -> u8 {
    match source {
        JobSource::Internal => TRUST_INTERNAL,
        JobSource::Company(_) => TRUST_COMPANY,
        JobSource::Aggregator(_) => TRUST_AGGREGATOR,
    }
}

/// Adjust a baseline by the source's rolling probe success rate. A rate of
/// 0.5 is neutral; 1.0 adds the full bonus, 0.0 subtracts it. `None` (no
/// probe history yet) leaves the baseline untouched.
pub fn adjusted_trust(baseline: u8, success_rate: Option<f64>) -> u8 {
    let Some(rate) = success_rate else {
        return baseline;
    };

    let rate = rate.clamp(0.0, 1.0);
    let adjustment = ((rate - 0.5) * 2.0 * MAX_HEALTH_ADJUSTMENT as f64).round() as i32;
    (baseline as i32 + adjustment).clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baselines_follow_source_class() {
        assert_eq!(baseline_trust(&JobSource::Internal), 100);
        assert_eq!(baseline_trust(&JobSource::Company("acme".into())), 85);
        assert_eq!(baseline_trust(&JobSource::Aggregator("jobhub".into())), 60);
    }

    #[test]
    fn perfect_probe_history_adds_full_bonus() {
        assert_eq!(adjusted_trust(60, Some(1.0)), 75);
        assert_eq!(adjusted_trust(85, Some(1.0)), 100);
    }

    #[test]
    fn failing_probe_history_subtracts() {
        assert_eq!(adjusted_trust(60, Some(0.0)), 45);
        assert_eq!(adjusted_trust(10, Some(0.0)), 0, "clamped at zero");
    }

    #[test]
    fn neutral_or_missing_history_keeps_baseline() {
        assert_eq!(adjusted_trust(60, Some(0.5)), 60);
        assert_eq!(adjusted_trust(60, None), 60);
    }

    #[test]
    fn adjustment_never_exceeds_bounds() {
        assert_eq!(adjusted_trust(100, Some(1.0)), 100);
        assert_eq!(adjusted_trust(100, Some(5.0)), 100, "rate is clamped first");
    }
}
