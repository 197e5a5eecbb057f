//! Session coordination core
//!
//! This module owns the only real concurrency in the crate:
//! - Cooperative stop signal shared by every stop trigger
//! - Cycle scheduler fanning out to the trader fleet each tick
//! - Auto-stop timer enforcing the session budget
//! - Session controller serializing start/stop/reset from the UI

pub mod auto_stop;
pub mod events;
pub mod scheduler;
pub mod session;
pub mod stop_signal;

pub use auto_stop::AutoStopTimer;
pub use events::{SessionEvent, SkipReason, StopTrigger};
pub use scheduler::{
    CycleReport, CycleScheduler, CycleSchedulerConfig, CycleStats, CycleStatsSnapshot,
    GateFailurePolicy,
};
pub use session::{
    SessionConfig, SessionController, SessionState, SessionStatus, StartOutcome, StopOutcome,
};
pub use stop_signal::{StopSignal, WaitOutcome};
