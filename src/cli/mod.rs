//! Command-line interface module.

mod args;

pub use args::{Cli, parse_or_exit};
