use anyhow::Result;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with file-based logging.
/// Logs are written to ~/.config/sanddollar/logs/sanddollar-YYYY-MM-DD-HH-MM-SS.log
pub fn init_logging() -> Result<PathBuf> {
    let logs_dir = dirs::config_dir()
        .ok_or(anyhow::anyhow!("Could not find config directory"))?
        .join("sanddollar")
        .join("logs");

    init_logging_in(&logs_dir)
}

pub fn init_logging_in(logs_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(logs_dir)?;

    let log_filename = log_file_name(&Local::now().format("%Y-%m-%d-%H-%M-%S").to_string());
    let log_path = logs_dir.join(&log_filename);

    let file_appender = tracing_appender::rolling::never(logs_dir, &log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    // RUST_LOG overrides the default
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()?;

    // The writer must outlive every log call
    std::mem::forget(guard);

    Ok(log_path)
}

fn log_file_name(timestamp: &str) -> String {
    format!("sanddollar-{}.log", timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_files_are_timestamped() {
        assert_eq!(
            log_file_name("2025-01-15-09-30-00"),
            "sanddollar-2025-01-15-09-30-00.log"
        );
    }
}
