//! Configuration for `hotserve`.
//!
//! Values come from three layers, later layers winning:
//!
//! 1. built-in defaults
//! 2. optional `hotserve.toml` in the working directory
//! 3. command-line arguments
//!
//! # Sections
//!
//! | Section   | Purpose                                         |
//! |-----------|-------------------------------------------------|
//! | `[serve]` | Listener address, settle delay, stop timeout    |
//! | `[watch]` | Strategy, poll interval, debounce, file filter  |

mod error;
mod section;

pub use error::ConfigError;
pub use section::{ServeConfig, WatchConfig, WatchStrategy};

use crate::{cli::Cli, log};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Root configuration structure representing hotserve.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevConfig {
    /// Directory being served and watched (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Change detection settings
    #[serde(default)]
    pub watch: WatchConfig,
}

impl DevConfig {
    /// Load configuration for the current working directory.
    ///
    /// A missing config file is not an error: defaults apply.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir()
            .map_err(|err| ConfigError::Io(PathBuf::from("."), err))?;
        let config_path = resolve_config_path(&cli.config, &cwd);

        let mut config = if config_path.is_file() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };

        config.root = cwd;
        config.apply_cli(cli);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    /// Apply command-line overrides.
    fn apply_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.serve.port, cli.port.as_ref());
        Self::update_option(&mut self.watch.strategy, cli.watcher.as_ref());
        if cli.no_fallback {
            self.watch.fallback = false;
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Reject values that would make the watch or restart loop misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serve.port == 0 {
            return Err(ConfigError::invalid(
                "serve.port",
                "port 0 picks a random port on every restart; choose a fixed port",
            ));
        }
        if self.watch.interval_ms == 0 {
            return Err(ConfigError::invalid(
                "watch.interval_ms",
                "poll interval must be at least 1ms",
            ));
        }
        if self.serve.stop_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "serve.stop_timeout_ms",
                "stop timeout must be at least 1ms",
            ));
        }
        if self.watch.extensions.as_ref().is_some_and(Vec::is_empty) {
            return Err(ConfigError::invalid(
                "watch.extensions",
                "empty list would never detect a change; remove the key to use defaults",
            ));
        }
        Ok(())
    }
}

/// `-C` path as given if absolute, otherwise relative to `cwd`.
fn resolve_config_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Parse config from TOML, panicking on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> DevConfig {
    let (parsed, ignored) = DevConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
