//! Change detection.
//!
//! Architecture:
//! ```text
//! Poller | EventWatcher → ChangeEvent channel → Debouncer → ChangeBatch
//! ```
//!
//! Both strategies apply the same [`WatchFilter`] and deliver events over
//! one channel, so the supervisor never branches on the strategy after
//! startup.

use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use notify::RecommendedWatcher;
use thiserror::Error;

use crate::config::WatchStrategy;

// Pure timing and path deduplication.
mod debouncer;
// OS notification strategy.
mod event;
// Extension allow-list and directory ignore-set.
mod filter;
// mtime snapshot used by the poller.
mod index;
// Polling strategy.
mod poll;

pub use debouncer::{ChangeBatch, Debouncer};
pub use event::EventWatcher;
pub use filter::WatchFilter;
pub use poll::Poller;

/// A watched file changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub detected_at: Instant,
}

impl ChangeEvent {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            detected_at: Instant::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to start file watcher")]
    Init(#[from] notify::Error),

    #[error("failed to spawn poller thread")]
    Spawn(#[source] std::io::Error),
}

/// Change detection strategy, chosen at startup.
pub enum ChangeDetector {
    Poll(Poller),
    Event(EventWatcher),
}

impl ChangeDetector {
    pub fn new(strategy: WatchStrategy, filter: WatchFilter, interval: Duration) -> Self {
        match strategy {
            WatchStrategy::Poll => Self::Poll(Poller::new(filter, interval)),
            WatchStrategy::Event => Self::Event(EventWatcher::new(filter)),
        }
    }

    pub fn strategy(&self) -> WatchStrategy {
        match self {
            Self::Poll(_) => WatchStrategy::Poll,
            Self::Event(_) => WatchStrategy::Event,
        }
    }

    /// Start detecting. Events arrive on [`Observation::events`] until
    /// the observation is stopped or dropped.
    pub fn observe(self) -> Result<Observation, WatchError> {
        let strategy = self.strategy();
        let (events_tx, events_rx) = channel::unbounded();

        match self {
            Self::Poll(poller) => {
                let (stop_tx, stop_rx) = channel::bounded(1);
                let worker = poller.spawn(events_tx, stop_rx).map_err(WatchError::Spawn)?;
                Ok(Observation {
                    strategy,
                    events: events_rx,
                    stop_tx: Some(stop_tx),
                    worker: Some(worker),
                    watcher: None,
                })
            }
            Self::Event(watcher) => {
                let watcher = watcher.spawn(events_tx)?;
                Ok(Observation {
                    strategy,
                    events: events_rx,
                    stop_tx: None,
                    worker: None,
                    watcher: Some(watcher),
                })
            }
        }
    }
}

/// A running detector.
pub struct Observation {
    strategy: WatchStrategy,
    events: Receiver<ChangeEvent>,
    /// Dropping the sender wakes the poller's `select!`
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    /// Watcher handle (must be kept alive)
    watcher: Option<RecommendedWatcher>,
}

impl Observation {
    pub fn strategy(&self) -> WatchStrategy {
        self.strategy
    }

    pub fn events(&self) -> &Receiver<ChangeEvent> {
        &self.events
    }

    /// Stop detection and wait for the poller thread, if any.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.watcher.take();
        self.stop_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.shutdown();
    }
}
