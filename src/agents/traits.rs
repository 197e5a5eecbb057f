//! Collaborator traits the session core drives.
//!
//! The scheduler treats every implementation as an opaque unit of work:
//! it never inspects agent decisions, only whether a run succeeded.

use async_trait::async_trait;

use crate::error::Result;

/// One autonomous trader.
///
/// `run()` executes the trader's logic exactly once. The scheduler calls it
/// once per cycle, concurrently with every other trader, so implementations
/// must tolerate overlapping calls across agents.
#[async_trait]
pub trait TradingAgent: Send + Sync + 'static {
    /// Display name, used as the `agent` field in logs
    fn name(&self) -> &str;

    /// Run the trader once. Errors are logged and counted by the scheduler.
    async fn run(&self) -> Result<()>;
}

/// Decides whether a cycle should execute (e.g. exchange open hours).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketGate: Send + Sync + 'static {
    /// Queried at most once per cycle; must not have side effects.
    async fn is_open(&self) -> Result<bool>;
}

/// Restores every trader's account and strategy to its initial state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResetCollaborator: Send + Sync + 'static {
    async fn reset_all(&self) -> Result<()>;
}
