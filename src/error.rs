use thiserror::Error;

/// Main error type for the trading floor
#[derive(Error, Debug)]
pub enum FloorError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Collaborator errors
    #[error("Agent {agent} failed: {reason}")]
    Agent { agent: String, reason: String },

    #[error("Market gate unavailable: {0}")]
    MarketGate(String),

    #[error("Reset failed: {0}")]
    Reset(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for FloorError
pub type Result<T> = std::result::Result<T, FloorError>;

impl FloorError {
    /// Shorthand for an agent failure
    pub fn agent(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        FloorError::Agent {
            agent: agent.into(),
            reason: reason.into(),
        }
    }
}
