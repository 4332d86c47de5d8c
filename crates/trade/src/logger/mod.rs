use std::{fs, fs::OpenOptions, io, path::PathBuf};

use chrono::Local;
use tracing_appender::non_blocking;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_DIR: &str = "logs";
pub const LOG_PREFIX: &str = "trading_bot";

/// Keeps the non-blocking writers flushing; hold it until the process exits.
pub struct TracingGuards {
    _file: tracing_appender::non_blocking::WorkerGuard,
    _stdout: tracing_appender::non_blocking::WorkerGuard,
}

/// Sets up the daily log file (everything from DEBUG up) and the console
/// (INFO and up, or whatever `RUST_LOG` asks for).
pub fn init_tracing() -> io::Result<TracingGuards> {
    let (file_writer, file_guard) = custom_daily_file_appender(LOG_DIR, LOG_PREFIX)?;
    let (stdout_writer, stdout_guard) = non_blocking(io::stdout());

    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_filter = EnvFilter::new("debug");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(file_writer)
                .with_filter(file_filter),
        )
        .with(
            fmt::layer()
                .with_writer(stdout_writer)
                .with_ansi(true)
                .with_filter(stdout_filter),
        )
        .init();

    Ok(TracingGuards {
        _file: file_guard,
        _stdout: stdout_guard,
    })
}

/// Opens `{base_dir}/{prefix}.YYYY-MM-DD.log` for appending.
fn custom_daily_file_appender(
    base_dir: &str,
    prefix: &str,
) -> io::Result<(
    non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
)> {
    fs::create_dir_all(base_dir)?;

    let mut path = PathBuf::from(base_dir);
    path.push(log_file_name(prefix, &Local::now().format("%Y-%m-%d").to_string()));

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(non_blocking(file))
}

fn log_file_name(prefix: &str, date: &str) -> String {
    format!("{prefix}.{date}.log")
}
