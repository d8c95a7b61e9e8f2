use std::path::PathBuf;
use std::process;

use clap::Parser;

use crate::application::data::{ErrorPolicy, LogLevel};

/// Exit code for a malformed invocation.
const USAGE_EXIT_CODE: i32 = 1;

/// Periodically mirror a source directory onto a destination directory.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Directory to mirror from
    pub source: PathBuf,
    /// Directory to mirror into
    pub destination: PathBuf,

    /// Seconds between the start of two consecutive sync cycles
    #[clap(long, short, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// File every log line is appended to, next to standard output
    #[clap(long, default_value = "log.txt")]
    pub log_file: PathBuf,

    #[clap(long, short, default_value = "info", value_enum)]
    pub log_level: LogLevel,

    /// What to do when a sync cycle fails
    #[clap(long, default_value = "exit", value_enum)]
    pub on_error: ErrorPolicy,
}

impl Cli {
    /// Parses the process arguments. A malformed invocation prints the
    /// usage to standard output and exits with code 1; `--help` and
    /// `--version` exit normally.
    pub fn parse_or_exit() -> Self {
        match Self::try_parse() {
            Ok(cli) => cli,
            Err(error) if error.use_stderr() => {
                println!("{}", error.render());
                process::exit(USAGE_EXIT_CODE);
            }
            Err(error) => error.exit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use rstest::*;

    #[test]
    fn test_parses_positional_directories() {
        let cli = Cli::try_parse_from(["dirsync", "/data/src", "/data/dst"]).expect("Parse");

        assert_eq!(cli.source, PathBuf::from("/data/src"));
        assert_eq!(cli.destination, PathBuf::from("/data/dst"));
        assert_eq!(cli.interval, 5);
        assert_eq!(cli.log_file, PathBuf::from("log.txt"));
        assert_eq!(cli.log_level, LogLevel::Info);
        assert_eq!(cli.on_error, ErrorPolicy::Exit);
    }

    #[rstest]
    #[case::no_arguments(&["dirsync"])]
    #[case::one_argument(&["dirsync", "src"])]
    #[case::three_arguments(&["dirsync", "src", "dst", "extra"])]
    fn test_wrong_argument_count_is_a_usage_error(#[case] args: &[&str]) {
        let error = Cli::try_parse_from(args).expect_err("Parse should fail");

        assert!(error.use_stderr());
        assert!(error.render().to_string().contains("Usage"));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let error = Cli::try_parse_from(["dirsync", "src", "dst", "--interval", "0"])
            .expect_err("Parse should fail");

        assert_eq!(error.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_help_is_not_a_usage_error() {
        let error = Cli::try_parse_from(["dirsync", "--help"]).expect_err("Help short-circuits");

        assert_eq!(error.kind(), ErrorKind::DisplayHelp);
        assert!(!error.use_stderr());
    }
}
