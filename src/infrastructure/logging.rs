use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::config::LoggingConfig;
use crate::domain::DomainError;

/// Keeps the non-blocking file writer alive. Dropping it flushes the log.
pub struct LogGuard {
    file: Option<WorkerGuard>,
}

impl LogGuard {
    pub fn writes_file(&self) -> bool {
        self.file.is_some()
    }
}

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("driverstage={},warn", level)))
}

/// Initialize logging: human-readable lines on stderr, plus a daily rolling
/// JSON log in `logs_dir` when file logging is enabled.
///
/// `RUST_LOG` overrides the configured level. Initializing twice is not an
/// error; the first subscriber stays in place.
pub fn init_logging(logs_dir: &Path, config: &LoggingConfig) -> Result<LogGuard, DomainError> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_filter(filter_for(&config.level));

    if !config.file_logging {
        let _ = tracing_subscriber::registry().with(console_layer).try_init();
        tracing::debug!(level = %config.level, "Logging initialized (console only)");
        return Ok(LogGuard { file: None });
    }

    fs::create_dir_all(logs_dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, "driverstage.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(filter_for(&config.level));

    if tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
    {
        tracing::debug!(logs_dir = ?logs_dir, level = %config.level, "Logging initialized with file output");
    }

    Ok(LogGuard { file: Some(guard) })
}
