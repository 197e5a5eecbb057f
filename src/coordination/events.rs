//! Session lifecycle events broadcast to UI subscribers

use serde::Serialize;
use uuid::Uuid;

use super::session::StopOutcome;

/// What initiated a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopTrigger {
    /// Operator pressed Stop
    User,
    /// Session budget expired
    AutoStop,
}

impl std::fmt::Display for StopTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopTrigger::User => write!(f, "user"),
            StopTrigger::AutoStop => write!(f, "auto_stop"),
        }
    }
}

/// Why a cycle did not run its agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Gate reported the market closed
    MarketClosed,
    /// Gate query failed under the fail-closed policy
    GateUnavailable,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MarketClosed => write!(f, "market_closed"),
            SkipReason::GateUnavailable => write!(f, "gate_unavailable"),
        }
    }
}

/// Event emitted by the session controller and its scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new session was spawned
    Started { session_id: Uuid },
    /// A cycle's fan-in finished
    CycleCompleted {
        cycle: u64,
        succeeded: usize,
        failed: usize,
    },
    /// A cycle was skipped; cadence continues
    CycleSkipped { cycle: u64, reason: SkipReason },
    /// The stop signal was raised
    StopRequested { trigger: StopTrigger },
    /// The session budget expired before any manual stop
    AutoStopFired { session_id: Uuid },
    /// The scheduler task is gone and its handle released
    Stopped {
        session_id: Uuid,
        outcome: StopOutcome,
    },
}
