use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::ChangeEvent;

/// Paths collected during one quiet period, in path order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch(Vec<PathBuf>);

impl ChangeBatch {
    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

struct State {
    pending: BTreeSet<PathBuf>,
    last_event: Option<Instant>,
}

/// Pure debouncer: only handles timing and path deduplication.
///
/// Every fed event pushes the deadline out by `delay`; the trigger fires
/// once the stream has been quiet that long.
pub struct Debouncer {
    delay: Duration,
    state: Mutex<State>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Mutex::new(State {
                pending: BTreeSet::new(),
                last_event: None,
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn feed(&self, event: ChangeEvent) {
        let mut state = self.state.lock();
        state.last_event = Some(match state.last_event {
            Some(last) => last.max(event.detected_at),
            None => event.detected_at,
        });
        state.pending.insert(event.path);
    }

    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        let state = self.state.lock();
        Self::ready(&state, self.delay)
    }

    fn ready(state: &State, delay: Duration) -> bool {
        state
            .last_event
            .is_some_and(|last| last.elapsed() >= delay && !state.pending.is_empty())
    }

    /// Take the pending batch if the quiet period has elapsed.
    pub fn take_if_ready(&self) -> Option<ChangeBatch> {
        let mut state = self.state.lock();
        if !Self::ready(&state, self.delay) {
            return None;
        }

        state.last_event = None;
        let paths = std::mem::take(&mut state.pending);
        Some(ChangeBatch(paths.into_iter().collect()))
    }

    /// Invoke `callback` with the batch if the quiet period has elapsed.
    ///
    /// Returns whether the callback ran. The lock is released before the
    /// callback, so it may take as long as a restart needs.
    pub fn on_trigger(&self, callback: impl FnOnce(ChangeBatch)) -> bool {
        match self.take_if_ready() {
            Some(batch) => {
                callback(batch);
                true
            }
            None => false,
        }
    }

    /// Precise sleep duration until next possible ready time.
    pub fn sleep_duration(&self) -> Duration {
        let state = self.state.lock();
        let Some(last_event) = state.last_event else {
            return Duration::from_secs(86400);
        };

        self.delay
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}
