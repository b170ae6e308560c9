//! Event strategy: OS filesystem notifications via `notify`.

use std::path::PathBuf;

use crossbeam::channel::Sender;
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::filter::WatchFilter;
use super::{ChangeEvent, WatchError};
use crate::debug;

/// Recursive OS watcher under the filter's root.
pub struct EventWatcher {
    filter: WatchFilter,
}

impl EventWatcher {
    pub fn new(filter: WatchFilter) -> Self {
        Self { filter }
    }

    /// Subscribe to notifications and forward qualifying paths.
    ///
    /// The subscription lives as long as the returned watcher; dropping it
    /// ends delivery.
    pub(super) fn spawn(self, events_tx: Sender<ChangeEvent>) -> Result<RecommendedWatcher, WatchError> {
        let root = self.filter.root().to_path_buf();
        let filter = self.filter;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for path in qualifying_paths(&event, &filter) {
                        debug!("watch"; "event: {}", path.display());
                        // Receiver gone means shutdown is in progress
                        let _ = events_tx.send(ChangeEvent::new(path));
                    }
                }
                Err(e) => debug!("watch"; "notify error: {}", e),
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        Ok(watcher)
    }
}

/// Create/modify paths from `event` that pass the filter.
///
/// Metadata-only changes (chmod, atime) are dropped, as are directories.
fn qualifying_paths(event: &notify::Event, filter: &WatchFilter) -> Vec<PathBuf> {
    let relevant = match event.kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    };
    if !relevant {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter(|path| !path.is_dir() && filter.accepts(path))
        .cloned()
        .collect()
}
