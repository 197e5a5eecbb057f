use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use trading_floor::config::LoggingConfig;

/// Console logging plus an optional daily-rolling file.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// life of the process.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},trading_floor=debug", config.level)));

    let log_dir = std::env::var("TRADING_FLOOR_LOG_DIR")
        .ok()
        .or_else(|| config.dir.clone());

    // `tracing_appender::rolling::daily` panics if it can't create the
    // initial file, so preflight writability.
    let mut guard = None;
    let file_layer = log_dir.and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("Warning: Could not create log directory {dir} ({e}), file logging disabled");
            return None;
        }
        let test_path = std::path::Path::new(&dir).join(".trading_floor_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);
                let file_appender = tracing_appender::rolling::daily(&dir, "trading-floor.log");
                let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
                guard = Some(worker_guard);
                eprintln!("Logging to: {dir}/trading-floor.log");
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!("Warning: Could not write to log directory {dir} ({e}), file logging disabled");
                None
            }
        }
    });

    let json_layer = config
        .json
        .then(|| tracing_subscriber::fmt::layer().json().with_target(true));
    let console_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    guard
}

pub fn init_logging_simple() {
    // Minimal logging for one-shot commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}
