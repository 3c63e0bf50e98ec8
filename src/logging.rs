use anyhow::{Context, Result};
use bot_core::LoggingConfig;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "sushi-grade-bot";

/// Keeps the file writer flushing until dropped.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
}

/// Logs to stdout and to a fresh `<dir>/sushi-grade-bot-<timestamp>.log`.
pub fn init_tracing(config: &LoggingConfig) -> Result<LoggingGuard> {
    fs::create_dir_all(&config.dir)
        .with_context(|| format!("failed to create log directory {}", config.dir.display()))?;

    let file_name = format!(
        "{}-{}.log",
        LOG_FILE_PREFIX,
        chrono::Local::now().format("%Y-%m-%dT%H-%M-%S")
    );
    let appender = tracing_appender::rolling::never(&config.dir, &file_name);
    let (file_writer, worker_guard) = tracing_appender::non_blocking(appender);

    let filter = || {
        EnvFilter::try_new(&config.filter)
            .with_context(|| format!("invalid logging.filter '{}'", config.filter))
    };

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(file_writer)
        .with_filter(filter()?);
    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stdout)
        .with_filter(filter()?);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    tracing::info!(
        dir = %config.dir.display(),
        file = %file_name,
        filter = %config.filter,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
    })
}
