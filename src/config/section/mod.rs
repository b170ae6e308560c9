//! Configuration section definitions.
//!
//! Each module corresponds to a section in `hotserve.toml`:
//!
//! | Module  | TOML Section | Purpose                              |
//! |---------|--------------|--------------------------------------|
//! | `serve` | `[serve]`    | Listener address and restart timing  |
//! | `watch` | `[watch]`    | Change detection strategy and filter |

mod serve;
mod watch;

pub use serve::ServeConfig;
pub use watch::{WatchConfig, WatchStrategy};
