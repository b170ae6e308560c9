//! Startup check that nothing else owns the port.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;

const PROBE_TIMEOUT: Duration = Duration::from_millis(300);

#[derive(Debug, Error)]
#[error("port {port} is already in use")]
pub struct PortInUse {
    pub port: u16,
}

/// Fail if a TCP connection to `localhost:<port>` succeeds.
///
/// Resolution failures count as free; the bind that follows reports
/// anything real.
pub fn ensure_port_free(port: u16) -> Result<(), PortInUse> {
    let Ok(addrs) = ("localhost", port).to_socket_addrs() else {
        return Ok(());
    };

    for addr in addrs {
        if TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok() {
            return Err(PortInUse { port });
        }
    }
    Ok(())
}
