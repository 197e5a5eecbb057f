//! Simulated trader used by the console binary.
//!
//! Stands in for a model-backed trader: each run sleeps a random latency and
//! fails with a configured probability. Decision logic is deliberately absent.

use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::traits::TradingAgent;
use crate::config::SimulationConfig;
use crate::error::{FloorError, Result};

/// Identity of one trader seat
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraderProfile {
    pub name: String,
    pub lastname: String,
    pub model: String,
}

impl TraderProfile {
    /// Display title, e.g. "Warren (Grok 4 Fast) - Patience"
    pub fn title(&self) -> String {
        format!("{} ({}) - {}", self.name, self.model, self.lastname)
    }
}

/// Per-trader run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraderStats {
    pub runs: u64,
    pub failures: u64,
}

pub struct SimulatedTrader {
    profile: TraderProfile,
    min_latency_ms: u64,
    max_latency_ms: u64,
    failure_rate: f64,
    runs: AtomicU64,
    failures: AtomicU64,
}

impl SimulatedTrader {
    pub fn new(profile: TraderProfile, simulation: &SimulationConfig) -> Self {
        Self {
            profile,
            min_latency_ms: simulation.min_latency_ms,
            max_latency_ms: simulation.max_latency_ms.max(simulation.min_latency_ms),
            failure_rate: simulation.failure_rate.clamp(0.0, 1.0),
            runs: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn profile(&self) -> &TraderProfile {
        &self.profile
    }

    pub fn stats(&self) -> TraderStats {
        TraderStats {
            runs: self.runs.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Forget every recorded run
    pub fn reset(&self) {
        self.runs.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}

#[async_trait]
impl TradingAgent for SimulatedTrader {
    fn name(&self) -> &str {
        &self.profile.name
    }

    async fn run(&self) -> Result<()> {
        let (latency, fails) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(self.min_latency_ms..=self.max_latency_ms),
                rng.gen_bool(self.failure_rate),
            )
        };

        tokio::time::sleep(Duration::from_millis(latency)).await;
        self.runs.fetch_add(1, Ordering::Relaxed);

        if fails {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(FloorError::agent(
                &self.profile.name,
                format!("{} returned no decision", self.profile.model),
            ));
        }

        debug!(agent = %self.profile.name, latency_ms = latency, "Trader run complete");
        Ok(())
    }
}
