//! Trader roster built from configuration

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::simulated::{SimulatedTrader, TraderProfile, TraderStats};
use super::traits::{ResetCollaborator, TradingAgent};
use crate::config::AppConfig;
use crate::error::Result;

/// One line of the roster summary
#[derive(Debug, Clone, Serialize)]
pub struct TraderSummary {
    pub title: String,
    pub stats: TraderStats,
}

/// The fleet of simulated traders
pub struct Roster {
    traders: Vec<Arc<SimulatedTrader>>,
}

impl Roster {
    pub fn from_config(config: &AppConfig) -> Self {
        let traders = config
            .roster
            .traders
            .iter()
            .enumerate()
            .map(|(index, seat)| {
                let profile = TraderProfile {
                    name: seat.name.clone(),
                    lastname: seat.lastname.clone(),
                    model: config.roster.model_for(index).to_string(),
                };
                Arc::new(SimulatedTrader::new(profile, &config.simulation))
            })
            .collect();

        Self { traders }
    }

    pub fn len(&self) -> usize {
        self.traders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traders.is_empty()
    }

    /// Traders as scheduler agents
    pub fn agents(&self) -> Vec<Arc<dyn TradingAgent>> {
        self.traders
            .iter()
            .map(|trader| Arc::clone(trader) as Arc<dyn TradingAgent>)
            .collect()
    }

    pub fn summaries(&self) -> Vec<TraderSummary> {
        self.traders
            .iter()
            .map(|trader| TraderSummary {
                title: trader.profile().title(),
                stats: trader.stats(),
            })
            .collect()
    }
}

#[async_trait]
impl ResetCollaborator for Roster {
    async fn reset_all(&self) -> Result<()> {
        for trader in &self.traders {
            trader.reset();
        }
        info!(traders = self.traders.len(), "Roster reset");
        Ok(())
    }
}
