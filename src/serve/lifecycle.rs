//! Server lifecycle management.
//!
//! ```text
//! Idle → Starting → Listening → Stopping → Idle
//! ```
//!
//! Every transition happens under one mutex, so a restart is a single
//! critical section: two restart requests never interleave and never
//! leave two listeners bound to the same port.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::backend::{Backend, BindError, StopOutcome};
use crate::{debug, logger};

/// Listener state as seen from outside the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartState {
    Idle,
    Starting,
    Listening,
    Stopping,
}

/// Where and how to run the listener.
#[derive(Debug, Clone)]
pub struct ListenerSettings {
    pub addr: SocketAddr,
    pub root: PathBuf,
    /// Pause between stop and start so the OS can release the socket
    pub settle_delay: Duration,
    pub stop_timeout: Duration,
}

struct Inner<H> {
    state: RestartState,
    handle: Option<H>,
}

/// Owns the single listener handle.
pub struct ServerLifecycle<B: Backend> {
    backend: B,
    settings: ListenerSettings,
    inner: Mutex<Inner<B::Handle>>,
}

impl<B: Backend> ServerLifecycle<B> {
    pub fn new(backend: B, settings: ListenerSettings) -> Self {
        Self {
            backend,
            settings,
            inner: Mutex::new(Inner {
                state: RestartState::Idle,
                handle: None,
            }),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.settings.addr
    }

    #[cfg(test)]
    pub fn state(&self) -> RestartState {
        self.inner.lock().state
    }

    /// Bind the listener. A no-op if already listening.
    pub fn start(&self) -> Result<(), BindError> {
        let mut inner = self.inner.lock();
        self.start_locked(&mut inner)
    }

    /// Release the listener. A no-op if nothing is listening.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        self.stop_locked(&mut inner);
    }

    /// Stop, settle, start; retry the start once after another settle.
    ///
    /// On a second bind failure the lifecycle stays `Idle` with no
    /// listener and the error is returned for the caller to report.
    pub fn restart(&self) -> Result<(), BindError> {
        let mut inner = self.inner.lock();
        debug!("serve"; "restart requested while {:?}", inner.state);

        self.stop_locked(&mut inner);
        thread::sleep(self.settings.settle_delay);

        match self.start_locked(&mut inner) {
            Ok(()) => Ok(()),
            Err(first) => {
                debug!("serve"; "{}, retrying once", first);
                thread::sleep(self.settings.settle_delay);
                self.start_locked(&mut inner)
            }
        }
    }

    fn start_locked(&self, inner: &mut Inner<B::Handle>) -> Result<(), BindError> {
        if inner.handle.is_some() {
            return Ok(());
        }

        inner.state = RestartState::Starting;
        match self.backend.start(self.settings.addr, &self.settings.root) {
            Ok(handle) => {
                inner.handle = Some(handle);
                inner.state = RestartState::Listening;
                Ok(())
            }
            Err(e) => {
                inner.state = RestartState::Idle;
                Err(e)
            }
        }
    }

    fn stop_locked(&self, inner: &mut Inner<B::Handle>) {
        let Some(handle) = inner.handle.take() else {
            return;
        };

        inner.state = RestartState::Stopping;
        match self.backend.stop(handle, self.settings.stop_timeout) {
            StopOutcome::Clean => {}
            StopOutcome::TimedOut => {
                logger::status_warning(&format!(
                    "server on {} did not stop within {}ms; continuing",
                    self.settings.addr,
                    self.settings.stop_timeout.as_millis()
                ));
                logger::status_detach();
            }
        }
        inner.state = RestartState::Idle;
    }
}

impl<B: Backend> Drop for ServerLifecycle<B> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(handle) = inner.handle.take() {
            debug!("serve"; "releasing listener on {}", self.settings.addr);
            self.backend.stop(handle, self.settings.stop_timeout);
            inner.state = RestartState::Idle;
        }
    }
}
