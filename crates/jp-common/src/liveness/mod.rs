pub mod queue;
pub mod schedule;
pub mod signals;
pub mod source_health;
pub mod state;

pub use queue::{
    MAX_PROBE_ATTEMPTS, ProbeError, ProbeQueue, ProbeResolution, ProbeTask, ProbeTaskStatus,
};
pub use schedule::next_probe_interval;
pub use signals::{ProbeSignal, classify_response};
pub use source_health::RollingHealth;
pub use state::{apply_probe_signal, is_valid_transition};
