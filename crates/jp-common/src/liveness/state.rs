use crate::LivenessStatus;

use super::signals::ProbeSignal;

/// Whether a status change is allowed. `Unknown` is an entry state only:
/// once a job has been verified either way, it never returns to `Unknown`
/// through normal probing (a URL change on re-ingest resets it instead).
pub fn is_valid_transition(from: LivenessStatus, to: LivenessStatus) -> bool {
    use LivenessStatus::*;
    match (from, to) {
        (a, b) if a == b => true,
        (Unknown, Active) | (Unknown, Stale) => true,
        (Active, Stale) | (Stale, Active) => true,
        (Active, Unknown) | (Stale, Unknown) => false,
        _ => false,
    }
}

/// Fold a probe signal into the current status. Returns the new status, or
/// `None` when the signal carries no liveness information (network failures
/// say nothing about the posting itself).
pub fn apply_probe_signal(current: LivenessStatus, signal: &ProbeSignal) -> Option<LivenessStatus> {
    let target = match signal {
        ProbeSignal::Alive => LivenessStatus::Active,
        ProbeSignal::Gone { .. }
        | ProbeSignal::RedirectedAway { .. }
        | ProbeSignal::ClosedPhrase { .. } => LivenessStatus::Stale,
    };

    if is_valid_transition(current, target) {
        Some(target)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_can_resolve_either_way() {
        assert!(is_valid_transition(
            LivenessStatus::Unknown,
            LivenessStatus::Active
        ));
        assert!(is_valid_transition(
            LivenessStatus::Unknown,
            LivenessStatus::Stale
        ));
    }

    #[test]
    fn verified_statuses_never_return_to_unknown() {
        assert!(!is_valid_transition(
            LivenessStatus::Active,
            LivenessStatus::Unknown
        ));
        assert!(!is_valid_transition(
            LivenessStatus::Stale,
            LivenessStatus::Unknown
        ));
    }

    #[test]
    fn active_and_stale_flip_freely() {
        assert!(is_valid_transition(
            LivenessStatus::Active,
            LivenessStatus::Stale
        ));
        assert!(is_valid_transition(
            LivenessStatus::Stale,
            LivenessStatus::Active
        ));
    }

    #[test]
    fn alive_signal_activates() {
        assert_eq!(
            apply_probe_signal(LivenessStatus::Unknown, &ProbeSignal::Alive),
            Some(LivenessStatus::Active)
        );
        assert_eq!(
            apply_probe_signal(LivenessStatus::Stale, &ProbeSignal::Alive),
            Some(LivenessStatus::Active)
        );
    }

    #[test]
    fn gone_signal_marks_stale() {
        assert_eq!(
            apply_probe_signal(
                LivenessStatus::Active,
                &ProbeSignal::Gone { status_code: 404 }
            ),
            Some(LivenessStatus::Stale)
        );
        assert_eq!(
            apply_probe_signal(
                LivenessStatus::Unknown,
                &ProbeSignal::ClosedPhrase {
                    phrase: "no longer accepting applications".into()
                }
            ),
            Some(LivenessStatus::Stale)
        );
    }

    #[test]
    fn same_status_signal_is_a_no_op_transition() {
        assert_eq!(
            apply_probe_signal(LivenessStatus::Active, &ProbeSignal::Alive),
            Some(LivenessStatus::Active)
        );
    }
}
