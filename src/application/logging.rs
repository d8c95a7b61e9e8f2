use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use snafu::{ResultExt, Snafu};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::application::data::LogLevel;
use crate::ext::PathDisplayExt;

/// Installs the global subscriber: every line goes to stdout and is appended
/// to `log_file`. Nothing is installed, and the file is not opened, when the
/// level is [`LogLevel::Silent`].
///
/// The file writer sits behind a mutex, so lines from concurrent cycles never
/// interleave.
pub fn setup_tracing(level: LogLevel, log_file: &Path) -> Result<(), LoggingSetupError> {
    let Some(level) = level.to_tracing_level() else {
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .context(OpenLogFileSnafu { path: log_file })?;

    let stdout_ansi = supports_color::on(supports_color::Stream::Stdout).is_some();
    let stdout_layer = fmt::layer()
        .with_ansi(stdout_ansi)
        .with_target(false)
        .with_writer(std::io::stdout);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(LevelFilter::from_level(level))
        .try_init()
        .context(SubscriberSnafu)
}

#[derive(Debug, Snafu)]
pub enum LoggingSetupError {
    #[snafu(display("Failed to open log file {}", path.best_effort_display()))]
    OpenLogFileError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to install the log subscriber"))]
    SubscriberError {
        source: tracing_subscriber::util::TryInitError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_silent_level_skips_log_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let log_file = temp_dir.path().join("log.txt");

        setup_tracing(LogLevel::Silent, &log_file).expect("Silent setup should succeed");

        assert!(!log_file.exists());
    }

    #[test]
    fn test_unopenable_log_file_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let log_file = temp_dir.path().join("missing/log.txt");

        let error = setup_tracing(LogLevel::Info, &log_file).expect_err("Setup should fail");

        match error {
            LoggingSetupError::OpenLogFileError { path, .. } => assert_eq!(path, log_file),
            other => panic!("Expected OpenLogFileError, got {other:?}"),
        }
    }
}
