//! Polling strategy: periodic walk + mtime diff.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, select};
use jwalk::{Parallelism, WalkDir};
use rustc_hash::FxHashSet;

use super::filter::WatchFilter;
use super::index::{FileIndex, Seen};
use super::ChangeEvent;
use crate::debug;

/// Periodic directory walker.
pub struct Poller {
    filter: Arc<WatchFilter>,
    index: FileIndex,
    interval: Duration,
}

impl Poller {
    pub fn new(filter: WatchFilter, interval: Duration) -> Self {
        Self {
            filter: Arc::new(filter),
            index: FileIndex::new(),
            interval,
        }
    }

    /// Walk the tree once and return changed files in path order.
    ///
    /// Files seen for the first time only establish a baseline. Files that
    /// cannot be stat'ed (removed mid-scan) are skipped.
    pub fn scan(&mut self) -> Vec<PathBuf> {
        let mut files = self.collect_files();
        files.sort();

        let mut present = FxHashSet::default();
        let mut changed = Vec::new();

        for path in files {
            let Ok(modified) = std::fs::metadata(&path).and_then(|m| m.modified()) else {
                continue;
            };
            if self.index.observe(&path, modified) == Seen::Changed {
                changed.push(path.clone());
            }
            present.insert(path);
        }

        self.index.mark_missing(&present);
        changed
    }

    /// Number of files currently tracked.
    pub fn tracked(&self) -> usize {
        self.index.len()
    }

    fn collect_files(&self) -> Vec<PathBuf> {
        let prune = Arc::clone(&self.filter);

        WalkDir::new(self.filter.root())
            .skip_hidden(false)
            .parallelism(Parallelism::Serial)
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|entry| {
                    entry.as_ref().map_or(true, |entry| {
                        !(entry.file_type().is_dir()
                            && entry
                                .file_name()
                                .to_str()
                                .is_some_and(|name| prune.is_ignored_dir(name)))
                    })
                });
            })
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| !entry.file_type().is_dir())
            .map(|entry| entry.path())
            .filter(|path| self.filter.accepts(path))
            .collect()
    }

    /// Run the baseline scan, then poll on a background thread until
    /// `stop_rx` fires or the event receiver goes away.
    pub(super) fn spawn(
        mut self,
        events_tx: Sender<ChangeEvent>,
        stop_rx: Receiver<()>,
    ) -> std::io::Result<JoinHandle<()>> {
        self.scan();
        debug!("watch"; "baseline: {} files", self.tracked());

        thread::Builder::new()
            .name("poller".into())
            .spawn(move || self.run(&events_tx, &stop_rx))
    }

    fn run(mut self, events_tx: &Sender<ChangeEvent>, stop_rx: &Receiver<()>) {
        loop {
            select! {
                recv(stop_rx) -> _ => break,
                default(self.interval) => {}
            }

            for path in self.scan() {
                debug!("watch"; "modified: {}", path.display());
                if events_tx.send(ChangeEvent::new(path)).is_err() {
                    return;
                }
            }
        }
    }
}
