//! Static file listener on `tiny_http`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tiny_http::{Request, Server};

use super::backend::{Backend, BindError, StopOutcome};
use super::{path, response};
use crate::{debug, log};

/// Request handler threads per listener.
const REQUEST_THREADS: usize = 4;

/// Poll step while waiting for the accept loop to exit.
const STOP_POLL: Duration = Duration::from_millis(10);

/// Serves files from the root directory.
pub struct StaticServer {
    log_requests: bool,
}

impl StaticServer {
    pub fn new(log_requests: bool) -> Self {
        Self { log_requests }
    }
}

/// One bound listener and its accept loop thread.
pub struct ListenerHandle {
    server: Arc<Server>,
    worker: JoinHandle<()>,
    addr: SocketAddr,
}

impl Backend for StaticServer {
    type Handle = ListenerHandle;

    fn start(&self, addr: SocketAddr, root: &Path) -> Result<ListenerHandle, BindError> {
        let server = Server::http(addr).map_err(|e| BindError::new(addr, e))?;
        let server = Arc::new(server);

        let loop_server = Arc::clone(&server);
        let root = root.to_path_buf();
        let log_requests = self.log_requests;
        let worker = thread::Builder::new()
            .name("http".into())
            .spawn(move || run_request_loop(&loop_server, root, log_requests))
            .map_err(|e| BindError::new(addr, e))?;

        debug!("serve"; "listening on {}", addr);
        Ok(ListenerHandle {
            server,
            worker,
            addr,
        })
    }

    fn stop(&self, handle: ListenerHandle, timeout: Duration) -> StopOutcome {
        let ListenerHandle {
            server,
            worker,
            addr,
        } = handle;

        // Wakes `incoming_requests()`, which then ends
        server.unblock();

        let deadline = Instant::now() + timeout;
        while !worker.is_finished() {
            if Instant::now() >= deadline {
                return StopOutcome::TimedOut;
            }
            thread::sleep(STOP_POLL);
        }
        let _ = worker.join();

        // Last reference: tiny_http closes the listening socket on drop
        drop(server);
        debug!("serve"; "stopped {}", addr);
        StopOutcome::Clean
    }
}

fn run_request_loop(server: &Server, root: PathBuf, log_requests: bool) {
    let root = Arc::new(root);
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            log!("serve"; "request pool unavailable, serving inline: {e}");
            None
        }
    };

    for request in server.incoming_requests() {
        let root = Arc::clone(&root);
        let serve = move || {
            if let Err(e) = handle_request(request, &root, log_requests) {
                log!("serve"; "request error: {e}");
            }
        };
        match &pool {
            Some(pool) => pool.spawn(serve),
            None => serve(),
        }
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, root: &Path, log_requests: bool) -> anyhow::Result<()> {
    if log_requests {
        log!("request"; "{} {}", request.method(), request.url());
    }

    if !response::is_read_request(&request) {
        return response::respond_method_not_allowed(request);
    }

    match path::resolve_path(request.url(), root) {
        Some(path) => response::respond_file(request, &path),
        None => response::respond_not_found(request),
    }
}
