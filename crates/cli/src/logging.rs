//! Logging setup for one-shot commands and the worker

use std::path::Path;

use quill::{LOG_FILE_NAME, config::DaemonConfig};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize logging for one-shot commands (stderr, warnings and up).
///
/// Stdout carries command output, so nothing is logged there.
pub fn init_cli_logging() {
  let env_filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::WARN.into())
    .from_env_lossy();

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_writer(std::io::stderr)
    .init();
}

/// Parse log level from config string
fn parse_log_level(level: &str) -> LevelFilter {
  match level.to_lowercase().as_str() {
    "off" => LevelFilter::OFF,
    "error" => LevelFilter::ERROR,
    "warn" => LevelFilter::WARN,
    "info" => LevelFilter::INFO,
    "debug" => LevelFilter::DEBUG,
    "trace" => LevelFilter::TRACE,
    _ => LevelFilter::INFO,
  }
}

/// Initialize logging for the worker with config-driven settings.
///
/// In foreground mode: console only with colors
/// In background mode: rolling file in `log_dir` only (no ANSI)
///
/// Returns the guard that must be kept alive for the duration of the program
pub fn init_worker_logging(config: &DaemonConfig, log_dir: &Path, background: bool) -> Option<WorkerGuard> {
  // RUST_LOG overrides the configured level
  let env_filter = EnvFilter::builder()
    .with_default_directive(parse_log_level(&config.log_level).into())
    .from_env_lossy();

  if !background {
    tracing_subscriber::fmt()
      .with_env_filter(env_filter)
      .with_target(true)
      .with_ansi(true)
      .init();
    return None;
  }

  if std::fs::create_dir_all(log_dir).is_err() {
    // Fall back to console-only logging
    init_cli_logging();
    return None;
  }

  let file_appender = match config.log_rotation.as_str() {
    "hourly" => tracing_appender::rolling::hourly(log_dir, LOG_FILE_NAME),
    "never" => tracing_appender::rolling::never(log_dir, LOG_FILE_NAME),
    _ => tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME),
  };

  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(true)
    .with_ansi(false)
    .with_writer(file_writer)
    .init();

  Some(guard)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_log_level() {
    assert_eq!(parse_log_level("off"), LevelFilter::OFF);
    assert_eq!(parse_log_level("DEBUG"), LevelFilter::DEBUG);
    assert_eq!(parse_log_level("nonsense"), LevelFilter::INFO);
  }
}
