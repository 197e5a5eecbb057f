use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::adapters::parse_time;
use crate::coordination::{CycleSchedulerConfig, GateFailurePolicy, SessionConfig};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub roster: RosterConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// Seconds between the end of one cycle and the start of the next
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Skip the market gate entirely
    #[serde(default = "default_true")]
    pub run_even_when_market_closed: bool,
    /// What to do when the market gate cannot answer
    #[serde(default)]
    pub gate_failure_policy: GateFailurePolicy,
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            run_even_when_market_closed: true,
            gate_failure_policy: GateFailurePolicy::Closed,
        }
    }
}

impl SchedulerSettings {
    pub fn to_runtime(&self) -> CycleSchedulerConfig {
        CycleSchedulerConfig {
            tick_interval: Duration::from_secs(self.tick_interval_secs),
            run_when_market_closed: self.run_even_when_market_closed,
            gate_failure: self.gate_failure_policy,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Auto-stop budget in seconds (default: 10 minutes)
    #[serde(default = "default_budget_secs")]
    pub budget_secs: u64,
    /// Grace period for the scheduler to exit after stop
    #[serde(default = "default_graceful_stop_timeout_ms")]
    pub graceful_stop_timeout_ms: u64,
}

fn default_budget_secs() -> u64 {
    600
}

fn default_graceful_stop_timeout_ms() -> u64 {
    2000
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            budget_secs: default_budget_secs(),
            graceful_stop_timeout_ms: default_graceful_stop_timeout_ms(),
        }
    }
}

impl SessionSettings {
    pub fn to_runtime(&self) -> SessionConfig {
        SessionConfig {
            budget: Duration::from_secs(self.budget_secs),
            graceful_stop_timeout: Duration::from_millis(self.graceful_stop_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Exchange offset from UTC in minutes (e.g. -300 for New York winter time)
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// Session open, "HH:MM" local
    #[serde(default = "default_open")]
    pub open: String,
    /// Session close, "HH:MM" local
    #[serde(default = "default_close")]
    pub close: String,
}

/// Largest offset `chrono::FixedOffset` accepts, in whole minutes
const MAX_UTC_OFFSET_MINUTES: i32 = 23 * 60 + 59;

fn default_utc_offset_minutes() -> i32 {
    -300
}

fn default_open() -> String {
    "09:30".to_string()
}

fn default_close() -> String {
    "16:00".to_string()
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
            open: default_open(),
            close: default_close(),
        }
    }
}

/// One trader seat
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TraderSeat {
    pub name: String,
    pub lastname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterConfig {
    /// Give every trader its own model from `many_models`
    #[serde(default)]
    pub use_many_models: bool,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_many_models")]
    pub many_models: Vec<String>,
    #[serde(default = "default_traders")]
    pub traders: Vec<TraderSeat>,
}

fn default_model() -> String {
    "Grok 4 Fast".to_string()
}

fn default_many_models() -> Vec<String> {
    ["Longcat", "Deepseek", "Tongyi", "Grok 4 Fast"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_traders() -> Vec<TraderSeat> {
    [
        ("Warren", "Patience"),
        ("George", "Bold"),
        ("Ray", "Systematic"),
        ("Cathie", "Crypto"),
    ]
    .into_iter()
    .map(|(name, lastname)| TraderSeat {
        name: name.to_string(),
        lastname: lastname.to_string(),
    })
    .collect()
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            use_many_models: false,
            default_model: default_model(),
            many_models: default_many_models(),
            traders: default_traders(),
        }
    }
}

impl RosterConfig {
    /// Model assigned to the trader in seat `index`
    pub fn model_for(&self, index: usize) -> &str {
        if self.use_many_models {
            self.many_models
                .get(index)
                .map(String::as_str)
                .unwrap_or(&self.default_model)
        } else {
            &self.default_model
        }
    }
}

/// Knobs for the built-in simulated traders
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
    /// Probability in [0, 1] that a run fails
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,
}

fn default_min_latency_ms() -> u64 {
    200
}

fn default_max_latency_ms() -> u64 {
    1500
}

fn default_failure_rate() -> f64 {
    0.05
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_latency_ms: default_min_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
            failure_rate: default_failure_rate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for daily-rolling log files
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSettings::default(),
            session: SessionSettings::default(),
            market: MarketConfig::default(),
            roster: RosterConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("scheduler.tick_interval_secs", 60)?
            .set_default("session.budget_secs", 600)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("TRADING_FLOOR_ENV")
                        .unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (TRADING_FLOOR_SCHEDULER__TICK_INTERVAL_SECS, etc.)
            .add_source(
                Environment::with_prefix("TRADING_FLOOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.scheduler.tick_interval_secs == 0 {
            errors.push("scheduler.tick_interval_secs must be positive".to_string());
        }

        if self.session.budget_secs == 0 {
            errors.push("session.budget_secs must be positive".to_string());
        }

        if self.session.graceful_stop_timeout_ms == 0 {
            errors.push("session.graceful_stop_timeout_ms must be positive".to_string());
        }

        let offset_range = -MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES;
        if !offset_range.contains(&self.market.utc_offset_minutes) {
            errors.push(format!(
                "market.utc_offset_minutes must be within +/-{MAX_UTC_OFFSET_MINUTES}"
            ));
        }

        match (parse_time(&self.market.open), parse_time(&self.market.close)) {
            (Ok(open), Ok(close)) if open >= close => {
                errors.push("market.open must be before market.close".to_string());
            }
            (Err(e), _) | (_, Err(e)) => errors.push(format!("market hours: {e}")),
            _ => {}
        }

        if self.roster.traders.is_empty() {
            errors.push("roster.traders must not be empty".to_string());
        }

        if self
            .roster
            .traders
            .iter()
            .any(|seat| seat.name.trim().is_empty())
        {
            errors.push("roster.traders entries need a name".to_string());
        }

        if self.roster.use_many_models && self.roster.many_models.len() < self.roster.traders.len()
        {
            errors.push(format!(
                "roster.many_models has {} models for {} traders",
                self.roster.many_models.len(),
                self.roster.traders.len()
            ));
        }

        if !(0.0..=1.0).contains(&self.simulation.failure_rate) {
            errors.push("simulation.failure_rate must be between 0 and 1".to_string());
        }

        if self.simulation.min_latency_ms > self.simulation.max_latency_ms {
            errors.push("simulation.min_latency_ms exceeds max_latency_ms".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_floor() {
        let config = AppConfig::default();

        assert_eq!(config.scheduler.tick_interval_secs, 60);
        assert!(config.scheduler.run_even_when_market_closed);
        assert_eq!(config.scheduler.gate_failure_policy, GateFailurePolicy::Closed);
        assert_eq!(config.session.budget_secs, 600);
        assert_eq!(
            config.session.to_runtime().graceful_stop_timeout,
            Duration::from_secs(2)
        );
        assert_eq!(config.roster.traders.len(), 4);
        assert_eq!(config.roster.traders[0].name, "Warren");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let config = AppConfig::load_from("/nonexistent/trading-floor-config").unwrap();
        assert_eq!(config.scheduler.tick_interval_secs, 60);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.roster.default_model, "Grok 4 Fast");
    }

    #[test]
    fn test_model_assignment() {
        let mut roster = RosterConfig::default();
        assert_eq!(roster.model_for(2), "Grok 4 Fast");

        roster.use_many_models = true;
        assert_eq!(roster.model_for(0), "Longcat");
        assert_eq!(roster.model_for(2), "Tongyi");
    }

    #[test]
    fn test_validate_collects_every_violation() {
        let mut config = AppConfig::default();
        config.scheduler.tick_interval_secs = 0;
        config.session.budget_secs = 0;
        config.market.open = "17:00".into();
        config.simulation.failure_rate = 1.5;
        config.roster.use_many_models = true;
        config.roster.many_models.truncate(1);

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| e.contains("tick_interval_secs")));
        assert!(errors.iter().any(|e| e.contains("market.open")));
        assert!(errors.iter().any(|e| e.contains("many_models")));
    }

    #[test]
    fn test_validate_rejects_oversized_utc_offset() {
        let mut config = AppConfig::default();
        config.market.utc_offset_minutes = 40_000_000;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("utc_offset_minutes"));

        config.market.utc_offset_minutes = i32::MIN;
        assert!(config.validate().is_err());

        config.market.utc_offset_minutes = -1439;
        assert!(config.validate().is_ok());
    }
}
