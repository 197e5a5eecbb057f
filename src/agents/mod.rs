//! Trading Agents
//!
//! Collaborator traits driven by the session core, plus the simulated
//! trader fleet used by the console binary.

pub mod roster;
pub mod simulated;
pub mod traits;

pub use roster::{Roster, TraderSummary};
pub use simulated::{SimulatedTrader, TraderProfile, TraderStats};
pub use traits::{MarketGate, ResetCollaborator, TradingAgent};
