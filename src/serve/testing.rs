//! Test doubles for the listener seam.

use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use super::backend::{Backend, BindError, StopOutcome};

/// Ask the OS for a port that is free right now.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[derive(Debug, Default)]
pub struct Counters {
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub starts: AtomicUsize,
    pub start_attempts: AtomicUsize,
    pub stops: AtomicUsize,
    /// Number of upcoming starts that fail with `BindError`
    pub fail_next: AtomicUsize,
    pub hang_on_stop: AtomicBool,
}

/// Backend that binds nothing and counts live handles.
#[derive(Debug, Clone, Default)]
pub struct CountingBackend {
    pub counters: Arc<Counters>,
}

impl CountingBackend {
    pub fn failing_next(n: usize) -> Self {
        let backend = Self::default();
        backend.counters.fail_next.store(n, Ordering::SeqCst);
        backend
    }
}

pub struct CountingHandle;

impl Backend for CountingBackend {
    type Handle = CountingHandle;

    fn start(&self, addr: SocketAddr, _root: &Path) -> Result<CountingHandle, BindError> {
        let c = &self.counters;
        c.start_attempts.fetch_add(1, Ordering::SeqCst);

        let failing = c
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BindError::new(addr, "Address already in use"));
        }

        let live = c.live.fetch_add(1, Ordering::SeqCst) + 1;
        c.max_live.fetch_max(live, Ordering::SeqCst);
        // Widen the window in which an unserialized restart would overlap
        std::thread::sleep(Duration::from_millis(1));
        c.starts.fetch_add(1, Ordering::SeqCst);
        Ok(CountingHandle)
    }

    fn stop(&self, _handle: CountingHandle, _timeout: Duration) -> StopOutcome {
        let c = &self.counters;
        c.stops.fetch_add(1, Ordering::SeqCst);
        c.live.fetch_sub(1, Ordering::SeqCst);
        if c.hang_on_stop.load(Ordering::SeqCst) {
            StopOutcome::TimedOut
        } else {
            StopOutcome::Clean
        }
    }
}
