//! Command-line interface definitions.

use clap::error::ErrorKind;
use clap::{ColorChoice, Parser};
use std::path::PathBuf;

use crate::config::WatchStrategy;

/// Serve the current directory and restart on file changes
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Port number to listen on [default: 8000]
    #[arg(value_name = "PORT")]
    pub port: Option<u16>,

    /// Change detection strategy
    #[arg(short, long, value_enum)]
    pub watcher: Option<WatchStrategy>,

    /// Abort instead of falling back to polling when the event watcher fails
    #[arg(long)]
    pub no_fallback: bool,

    /// Config file path (optional, default: hotserve.toml)
    #[arg(short = 'C', long, default_value = "hotserve.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output (request log, raw watch events)
    #[arg(short, long)]
    pub verbose: bool,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,
}

/// Parse arguments, exiting with code 1 on invalid input.
///
/// clap exits with code 2 on usage errors; a bad port is a plain
/// configuration error here, so remap it. Help and version output keep
/// clap's own behavior.
pub fn parse_or_exit() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let cli = Cli::try_parse_from(["hotserve"]).unwrap();
        assert_eq!(cli.port, None);
        assert_eq!(cli.watcher, None);
        assert!(!cli.no_fallback);
        assert_eq!(cli.config, PathBuf::from("hotserve.toml"));
    }

    #[test]
    fn test_positional_port() {
        let cli = Cli::try_parse_from(["hotserve", "8001"]).unwrap();
        assert_eq!(cli.port, Some(8001));
    }

    #[test]
    fn test_non_numeric_port_is_error() {
        let err = Cli::try_parse_from(["hotserve", "eighty"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_out_of_range_port_is_error() {
        assert!(Cli::try_parse_from(["hotserve", "70000"]).is_err());
    }

    #[test]
    fn test_watcher_flag() {
        let cli = Cli::try_parse_from(["hotserve", "-w", "event", "--no-fallback"]).unwrap();
        assert_eq!(cli.watcher, Some(WatchStrategy::Event));
        assert!(cli.no_fallback);
    }
}
