//! Static file serving and the listener lifecycle.
//!
//! | Module      | Purpose                                        |
//! |-------------|------------------------------------------------|
//! | `backend`   | `Backend` trait, `BindError`, `StopOutcome`    |
//! | `http`      | `tiny_http` static file listener               |
//! | `lifecycle` | start/stop/restart state machine               |
//! | `preflight` | port-in-use probe before anything starts       |

mod backend;
mod http;
mod lifecycle;
mod path;
mod preflight;
mod response;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{Backend, BindError};
pub use http::StaticServer;
pub use lifecycle::{ListenerSettings, ServerLifecycle};
pub use preflight::{PortInUse, ensure_port_free};
