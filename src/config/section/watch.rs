//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! strategy = "poll"           # "poll" or "event"
//! fallback = true             # Poll when the OS watcher cannot start
//! interval_ms = 1000          # Poll interval
//! debounce_ms = 1000          # Quiet period before restarting
//! extensions = ["html", "js", "css", "json"]
//! ignore = [".git", "node_modules", ".beads", "__pycache__"]
//! ```
//!
//! `debounce_ms` and `extensions` default per strategy when omitted.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How file changes are detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WatchStrategy {
    /// Periodic directory walk with mtime comparison.
    #[default]
    Poll,
    /// OS filesystem notifications.
    Event,
}

impl WatchStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::Event => "event",
        }
    }

    fn default_debounce(self) -> Duration {
        match self {
            Self::Poll => Duration::from_millis(1000),
            Self::Event => Duration::from_millis(300),
        }
    }
}

const DEFAULT_EXTENSIONS: &[&str] = &["html", "js", "css", "json"];
const DEFAULT_IGNORE: &[&str] = &[".git", "node_modules", ".beads", "__pycache__"];

/// File watching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub strategy: WatchStrategy,

    /// Fall back to polling if the event watcher fails to initialize.
    pub fallback: bool,

    /// Poll interval in milliseconds.
    pub interval_ms: u64,

    /// Debounce window; strategy default when unset.
    pub debounce_ms: Option<u64>,

    /// Extension allow-list (without leading dot); strategy default when unset.
    pub extensions: Option<Vec<String>>,

    /// Directory names excluded from watching.
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            strategy: WatchStrategy::Poll,
            fallback: true,
            interval_ms: 1000,
            debounce_ms: None,
            extensions: None,
            ignore: DEFAULT_IGNORE.iter().map(ToString::to_string).collect(),
        }
    }
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Debounce window for the given strategy.
    ///
    /// Takes the strategy explicitly because a failed event watcher
    /// falls back to polling with the poll defaults.
    pub fn debounce_for(&self, strategy: WatchStrategy) -> Duration {
        self.debounce_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| strategy.default_debounce())
    }

    /// Extension allow-list for the given strategy, normalized without dots.
    pub fn extensions_for(&self, strategy: WatchStrategy) -> Vec<String> {
        match &self.extensions {
            Some(list) => list
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect(),
            None => {
                let mut list: Vec<String> =
                    DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect();
                if strategy == WatchStrategy::Event {
                    list.push("md".to_string());
                }
                list
            }
        }
    }
}
