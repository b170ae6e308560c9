//! The seam between the restart state machine and the actual listener.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

/// The port could not be bound.
#[derive(Debug, Error)]
#[error("cannot bind {addr}: {reason}")]
pub struct BindError {
    pub addr: SocketAddr,
    pub reason: String,
}

impl BindError {
    pub fn new(addr: SocketAddr, reason: impl ToString) -> Self {
        Self {
            addr,
            reason: reason.to_string(),
        }
    }
}

/// How a stop request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The accept loop exited and the socket is released.
    Clean,
    /// The loop did not exit within the timeout; the handle was discarded.
    TimedOut,
}

/// Something that can listen on an address and serve `root`.
///
/// `start` returns only once the socket is bound. `stop` unblocks the
/// accept loop and waits at most `timeout` for it to exit.
pub trait Backend: Send + Sync + 'static {
    type Handle: Send;

    fn start(&self, addr: SocketAddr, root: &Path) -> Result<Self::Handle, BindError>;

    fn stop(&self, handle: Self::Handle, timeout: Duration) -> StopOutcome;
}
