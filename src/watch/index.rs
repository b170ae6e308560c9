//! Snapshot of watched-file modification times.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rustc_hash::{FxHashMap, FxHashSet};

/// Last known state of one watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchedFile {
    pub modified: SystemTime,
    /// `false` once a completed scan no longer found the file.
    pub exists: bool,
}

/// Outcome of recording one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seen {
    /// First sighting: establishes the baseline, never a change.
    Baseline,
    Unchanged,
    Changed,
}

/// Path → last observed modification time.
///
/// Owned by the poller loop; nothing else mutates it.
#[derive(Debug, Default)]
pub struct FileIndex {
    entries: FxHashMap<PathBuf, WatchedFile>,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `modified` for `path` and report whether it counts as a change.
    ///
    /// A change is a strictly newer timestamp, or a file reappearing after
    /// a scan found it missing. The stored timestamp always follows the
    /// latest read, even when it moved backwards.
    pub fn observe(&mut self, path: &Path, modified: SystemTime) -> Seen {
        let Some(entry) = self.entries.get_mut(path) else {
            self.entries.insert(
                path.to_path_buf(),
                WatchedFile {
                    modified,
                    exists: true,
                },
            );
            return Seen::Baseline;
        };

        let changed = !entry.exists || modified > entry.modified;
        entry.modified = modified;
        entry.exists = true;

        if changed { Seen::Changed } else { Seen::Unchanged }
    }

    /// Flag every entry not in `present` as missing.
    ///
    /// Entries are kept so that a re-created file is reported as changed
    /// rather than silently re-baselined.
    pub fn mark_missing(&mut self, present: &FxHashSet<PathBuf>) {
        for (path, entry) in &mut self.entries {
            if !present.contains(path) {
                entry.exists = false;
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, path: &Path) -> Option<&WatchedFile> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
