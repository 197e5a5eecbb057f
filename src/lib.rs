pub mod adapters;
pub mod agents;
pub mod cli;
pub mod config;
pub mod coordination;
pub mod error;

pub use adapters::{AlwaysOpen, MarketHoursGate};
pub use agents::{MarketGate, ResetCollaborator, Roster, TradingAgent};
pub use config::AppConfig;
pub use coordination::{
    CycleScheduler, CycleSchedulerConfig, SessionConfig, SessionController, SessionEvent,
    StartOutcome, StopOutcome, StopSignal,
};
pub use error::{FloorError, Result};
