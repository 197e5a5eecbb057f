//! Cycle Scheduler
//!
//! Drives the fleet of trading agents through periodic cycles:
//! 1. Ask the market gate whether this tick should execute
//! 2. Fan out one run per agent, fan in on all of them
//! 3. Wait one tick interval, or less if the stop signal is raised
//!
//! Cycles are strictly sequential. Agents inside a cycle run in parallel
//! and a failing agent never aborts its siblings or the loop.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::events::{SessionEvent, SkipReason};
use super::stop_signal::{StopSignal, WaitOutcome};
use crate::agents::{MarketGate, TradingAgent};
use crate::error::FloorError;

/// Behaviour when the market gate cannot be queried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateFailurePolicy {
    /// Assume the market is open and run the cycle
    Open,
    /// Skip the cycle
    #[default]
    Closed,
}

/// Runtime settings for the scheduler
#[derive(Debug, Clone)]
pub struct CycleSchedulerConfig {
    /// Wait between the end of one cycle and the start of the next
    pub tick_interval: Duration,
    /// Run cycles without consulting the gate
    pub run_when_market_closed: bool,
    pub gate_failure: GateFailurePolicy,
}

impl Default for CycleSchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            run_when_market_closed: true,
            gate_failure: GateFailurePolicy::Closed,
        }
    }
}

/// Counters shared between a running scheduler and its supervisor
#[derive(Debug, Default)]
pub struct CycleStats {
    cycles_run: AtomicU64,
    cycles_skipped: AtomicU64,
    agent_runs: AtomicU64,
    agent_failures: AtomicU64,
}

/// Point-in-time copy of [`CycleStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleStatsSnapshot {
    pub cycles_run: u64,
    pub cycles_skipped: u64,
    pub agent_runs: u64,
    pub agent_failures: u64,
}

impl CycleStats {
    pub fn snapshot(&self) -> CycleStatsSnapshot {
        CycleStatsSnapshot {
            cycles_run: self.cycles_run.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            agent_runs: self.agent_runs.load(Ordering::Relaxed),
            agent_failures: self.agent_failures.load(Ordering::Relaxed),
        }
    }

    fn record_cycle(&self, report: &CycleReport) {
        self.cycles_run.fetch_add(1, Ordering::Relaxed);
        self.agent_runs
            .fetch_add((report.succeeded + report.failed) as u64, Ordering::Relaxed);
        self.agent_failures
            .fetch_add(report.failed as u64, Ordering::Relaxed);
    }

    fn record_skip(&self) {
        self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Outcome of one fan-out/fan-in round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Repeating fan-out/fan-in loop over a fixed set of agents
pub struct CycleScheduler {
    config: CycleSchedulerConfig,
    agents: Vec<Arc<dyn TradingAgent>>,
    gate: Arc<dyn MarketGate>,
    stop: StopSignal,
    stats: Arc<CycleStats>,
    events: Option<broadcast::Sender<SessionEvent>>,
}

impl CycleScheduler {
    pub fn new(
        config: CycleSchedulerConfig,
        agents: Vec<Arc<dyn TradingAgent>>,
        gate: Arc<dyn MarketGate>,
        stop: StopSignal,
    ) -> Self {
        Self {
            config,
            agents,
            gate,
            stop,
            stats: Arc::new(CycleStats::default()),
            events: None,
        }
    }

    /// Publish cycle events on `events`
    pub fn with_events(mut self, events: broadcast::Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Shared counters, readable while the scheduler runs
    pub fn stats(&self) -> Arc<CycleStats> {
        Arc::clone(&self.stats)
    }

    /// Loop until the stop signal is raised.
    ///
    /// A stop observed during the tick wait ends the loop; a stop raised
    /// mid-cycle lets the in-flight fan-in finish first.
    pub async fn run(self) {
        info!(
            agents = self.agents.len(),
            tick_secs = self.config.tick_interval.as_secs_f64(),
            run_when_closed = self.config.run_when_market_closed,
            "Cycle scheduler started"
        );

        let mut cycle: u64 = 0;
        while !self.stop.is_set() {
            cycle += 1;

            match self.gate_decision().await {
                Some(reason) => {
                    info!(cycle, %reason, "Skipping cycle");
                    self.stats.record_skip();
                    self.emit(SessionEvent::CycleSkipped { cycle, reason });
                }
                None => {
                    let report = self.run_cycle(cycle).await;
                    self.stats.record_cycle(&report);
                    self.emit(SessionEvent::CycleCompleted {
                        cycle,
                        succeeded: report.succeeded,
                        failed: report.failed,
                    });
                }
            }

            if self.stop.wait(self.config.tick_interval).await == WaitOutcome::Signaled {
                debug!(cycle, "Stop signal observed during tick wait");
                break;
            }
        }

        info!(cycles = cycle, "Cycle scheduler exited");
    }

    /// Run every agent once, concurrently, and wait for all of them.
    pub async fn run_cycle(&self, cycle: u64) -> CycleReport {
        let mut runs = JoinSet::new();

        for agent in &self.agents {
            let agent = Arc::clone(agent);
            let span = info_span!("agent_run", agent = %agent.name(), cycle);
            runs.spawn(
                async move {
                    let result = match AssertUnwindSafe(agent.run()).catch_unwind().await {
                        Ok(result) => result,
                        Err(_) => Err(FloorError::agent(agent.name(), "panicked")),
                    };
                    if let Err(e) = &result {
                        warn!(error = %e, "Agent run failed");
                    }
                    result
                }
                .instrument(span),
            );
        }

        let mut report = CycleReport::default();
        while let Some(joined) = runs.join_next().await {
            match joined {
                Ok(Ok(())) => report.succeeded += 1,
                Ok(Err(_)) => report.failed += 1,
                Err(e) => {
                    error!(cycle, "Agent task did not complete: {}", e);
                    report.failed += 1;
                }
            }
        }

        debug!(
            cycle,
            succeeded = report.succeeded,
            failed = report.failed,
            "Cycle fan-in complete"
        );
        report
    }

    /// `None` means run the cycle; `Some` carries the skip reason.
    async fn gate_decision(&self) -> Option<SkipReason> {
        if self.config.run_when_market_closed {
            return None;
        }

        match self.gate.is_open().await {
            Ok(true) => None,
            Ok(false) => Some(SkipReason::MarketClosed),
            Err(e) => match self.config.gate_failure {
                GateFailurePolicy::Open => {
                    warn!(error = %e, "Market gate unavailable, assuming open");
                    None
                }
                GateFailurePolicy::Closed => {
                    warn!(error = %e, "Market gate unavailable, skipping cycle");
                    Some(SkipReason::GateUnavailable)
                }
            },
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
