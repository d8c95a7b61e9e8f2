use std::path::PathBuf;
use std::time::Duration;

use crate::application::data::ErrorPolicy;
use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Time between the start of two consecutive cycles.
    pub interval: Duration,
    pub error_policy: ErrorPolicy,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            source: cli.source,
            destination: cli.destination,
            interval: Duration::from_secs(cli.interval),
            error_policy: cli.on_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_cli_defaults() {
        let cli = Cli::try_parse_from(["dirsync", "src", "dst"]).expect("Failed to parse");

        let config = RuntimeConfig::from(cli);

        assert_eq!(config.source, PathBuf::from("src"));
        assert_eq!(config.destination, PathBuf::from("dst"));
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.error_policy, ErrorPolicy::Exit);
    }

    #[test]
    fn test_from_cli_overrides() {
        let cli = Cli::try_parse_from([
            "dirsync",
            "src",
            "dst",
            "--interval",
            "30",
            "--on-error",
            "continue",
        ])
        .expect("Failed to parse");

        let config = RuntimeConfig::from(cli);

        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.error_policy, ErrorPolicy::Continue);
    }
}
