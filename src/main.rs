//! hotserve - serve a directory over HTTP and restart on file changes.

mod cli;
mod config;
mod logger;
mod serve;
mod supervisor;
mod utils;
mod watch;

use clap::ColorChoice;
use crossbeam::channel;

use cli::parse_or_exit;
use config::DevConfig;
use serve::StaticServer;
use supervisor::Supervisor;

fn main() {
    let cli = parse_or_exit();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = match DevConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            log!("error"; "{:#}", anyhow::Error::from(e));
            std::process::exit(1);
        }
    };

    // Ctrl+C only signals the supervisor; shutdown happens on its thread
    let (shutdown_tx, shutdown_rx) = channel::bounded(1);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    }) {
        log!("error"; "failed to set Ctrl+C handler: {e}");
        std::process::exit(1);
    }

    let supervisor = Supervisor::new(config, StaticServer::new(cli.verbose), shutdown_rx);
    if let Err(e) = supervisor.run() {
        let hint = e.hint();
        log!("error"; "{:#}", anyhow::Error::from(e));
        log!("error"; "hint: {hint}");
        std::process::exit(1);
    }
}
