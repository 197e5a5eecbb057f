mod main_runtime;

use anyhow::anyhow;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use trading_floor::adapters::MarketHoursGate;
use trading_floor::agents::{MarketGate, Roster};
use trading_floor::cli::{Cli, Commands, ConsoleCommand, CONSOLE_HELP};
use trading_floor::config::AppConfig;
use trading_floor::coordination::{SessionController, SessionEvent, StartOutcome};
use trading_floor::error::Result;

use main_runtime::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config_dir)?;

    match cli.command.unwrap_or(Commands::Console { autostart: false }) {
        Commands::Console { autostart } => {
            let _guard = init_logging(&config.logging);
            ensure_valid(&config)?;
            run_console(config, autostart).await?;
        }
        Commands::Reset => {
            init_logging_simple();
            ensure_valid(&config)?;
            let (controller, _) = build_controller(&config)?;
            match controller.reset().await {
                Ok(()) => println!("Traders have been reset successfully."),
                Err(e) => {
                    println!("Reset failed: {e}");
                    return Err(e);
                }
            }
        }
        Commands::CheckConfig => {
            init_logging_simple();
            ensure_valid(&config)?;
            println!("{config:#?}");
        }
    }

    Ok(())
}

fn ensure_valid(config: &AppConfig) -> Result<()> {
    config
        .validate()
        .map_err(|errors| anyhow!("invalid configuration: {}", errors.join("; ")).into())
}

fn build_controller(config: &AppConfig) -> Result<(SessionController, Arc<Roster>)> {
    let roster = Arc::new(Roster::from_config(config));
    let gate: Arc<dyn MarketGate> = Arc::new(MarketHoursGate::from_config(&config.market)?);

    let controller = SessionController::new(
        config.scheduler.to_runtime(),
        config.session.to_runtime(),
        roster.agents(),
        gate,
        roster.clone(),
    );
    Ok((controller, roster))
}

async fn run_console(config: AppConfig, autostart: bool) -> Result<()> {
    let (controller, roster) = build_controller(&config)?;

    info!(
        traders = roster.len(),
        tick_secs = config.scheduler.tick_interval_secs,
        budget_secs = config.session.budget_secs,
        "Trading floor console ready"
    );
    println!("{CONSOLE_HELP}");

    let mut events = controller.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(n)) => warn!("Console lagged {} session events", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if autostart {
        report_start(controller.start().await);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match line.parse::<ConsoleCommand>() {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{e}; {CONSOLE_HELP}");
                        continue;
                    }
                };
                match command {
                    ConsoleCommand::Run => report_start(controller.start().await),
                    ConsoleCommand::Stop => {
                        controller.request_stop();
                        println!("Stopping...");
                        let outcome = controller.stop().await;
                        println!("Stopped ({outcome})");
                    }
                    ConsoleCommand::Reset => match controller.reset().await {
                        Ok(()) => println!("Traders have been reset successfully."),
                        Err(e) => println!("Reset failed: {e}"),
                    },
                    ConsoleCommand::Status => {
                        let status = controller.status().await;
                        println!("{}", serde_json::to_string_pretty(&status)?);
                        for summary in roster.summaries() {
                            println!(
                                "  {}: {} runs, {} failures",
                                summary.title, summary.stats.runs, summary.stats.failures
                            );
                        }
                    }
                    ConsoleCommand::Help => println!("{CONSOLE_HELP}"),
                    ConsoleCommand::Quit => break,
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    let outcome = controller.stop().await;
    info!(%outcome, "Console closed");
    printer.abort();
    Ok(())
}

fn report_start(outcome: StartOutcome) {
    match outcome {
        StartOutcome::Started { session_id } => println!("Session {session_id} started"),
        StartOutcome::AlreadyRunning { session_id } => {
            println!("Session {session_id} is already running")
        }
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::CycleCompleted {
            cycle,
            succeeded,
            failed,
        } => println!("[cycle {cycle}] {succeeded} traders ran, {failed} failed"),
        SessionEvent::CycleSkipped { cycle, reason } => {
            println!("[cycle {cycle}] skipped: {reason}")
        }
        SessionEvent::AutoStopFired { .. } => println!("Session budget reached, stopping"),
        SessionEvent::Stopped { outcome, .. } => println!("Session ended ({outcome})"),
        SessionEvent::Started { .. } | SessionEvent::StopRequested { .. } => {}
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
