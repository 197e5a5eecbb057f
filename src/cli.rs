use clap::{Parser, Subcommand};
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "trading-floor")]
#[command(author = "Trading Floor Team")]
#[command(version = "0.1.0")]
#[command(about = "Runs a fleet of autonomous traders in budgeted sessions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config directory (default.toml, <env>.toml)
    #[arg(short, long, default_value = "config", env = "TRADING_FLOOR_CONFIG_DIR")]
    pub config_dir: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the operator console (run / stop / reset / status / quit)
    Console {
        /// Start a session immediately
        #[arg(long)]
        autostart: bool,
    },
    /// Reset every trader once and exit
    Reset,
    /// Validate configuration and print the effective values
    CheckConfig,
}

/// One operator action typed into the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Run,
    Stop,
    Reset,
    Status,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "run" | "start" => Ok(ConsoleCommand::Run),
            "stop" => Ok(ConsoleCommand::Stop),
            "reset" => Ok(ConsoleCommand::Reset),
            "status" | "s" => Ok(ConsoleCommand::Status),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command: {other}")),
        }
    }
}

pub const CONSOLE_HELP: &str =
    "commands: run | stop | reset | status | help | quit  (sessions auto-stop after the configured budget)";
