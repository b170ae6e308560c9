//! Wires change detection to server restarts.
//!
//! ```text
//! preflight → ServerLifecycle::start → ChangeDetector::observe
//!     loop: events → Debouncer → ServerLifecycle::restart
//! shutdown: stop detector → stop server
//! ```

use crossbeam::channel::{Receiver, select};
use owo_colors::OwoColorize;
use thiserror::Error;

use crate::config::{DevConfig, WatchStrategy};
use crate::serve::{
    Backend, BindError, ListenerSettings, PortInUse, ServerLifecycle, ensure_port_free,
};
use crate::utils::path::{normalize_path, relative_display};
use crate::utils::plural::plural_count;
use crate::watch::{ChangeBatch, ChangeDetector, Debouncer, Observation, WatchError, WatchFilter};
use crate::{debug, log, logger};

/// Fatal conditions that end the process with exit code 1.
#[derive(Debug, Error)]
pub enum SuperviseError {
    #[error(transparent)]
    PortInUse(#[from] PortInUse),

    #[error("failed to start server")]
    Bind(#[from] BindError),

    #[error("file watcher unavailable")]
    Watch(#[from] WatchError),
}

impl SuperviseError {
    /// What the user can do about it.
    pub fn hint(&self) -> String {
        match self {
            Self::PortInUse(e) => format!(
                "try a different port: hotserve {}",
                e.port.saturating_add(1)
            ),
            Self::Bind(e) => format!(
                "try a different port: hotserve {}",
                e.addr.port().saturating_add(1)
            ),
            Self::Watch(_) => {
                "use `--watcher poll`, or drop `--no-fallback` to poll automatically".into()
            }
        }
    }
}

/// Owns the server and the detector for one run of the program.
pub struct Supervisor<B: Backend> {
    config: DevConfig,
    lifecycle: ServerLifecycle<B>,
    shutdown_rx: Receiver<()>,
    /// Receives a copy of every batch that triggered a restart
    #[cfg(test)]
    batches: Option<crossbeam::channel::Sender<ChangeBatch>>,
}

impl<B: Backend> Supervisor<B> {
    /// `shutdown_rx` fires (or disconnects) to end [`Supervisor::run`].
    pub fn new(config: DevConfig, backend: B, shutdown_rx: Receiver<()>) -> Self {
        let settings = ListenerSettings {
            addr: config.serve.addr(),
            root: config.root.clone(),
            settle_delay: config.serve.settle_delay(),
            stop_timeout: config.serve.stop_timeout(),
        };
        Self {
            lifecycle: ServerLifecycle::new(backend, settings),
            config,
            shutdown_rx,
            #[cfg(test)]
            batches: None,
        }
    }

    /// Run until shutdown. Returns only fatal startup errors.
    pub fn run(self) -> Result<(), SuperviseError> {
        ensure_port_free(self.config.serve.port)?;
        self.lifecycle.start()?;

        let observation = match self.start_detector() {
            Ok(observation) => observation,
            Err(e) => {
                self.lifecycle.stop();
                return Err(e.into());
            }
        };

        self.print_banner(observation.strategy());

        let debouncer = Debouncer::new(self.config.watch.debounce_for(observation.strategy()));
        debug!("watch"; "debounce window {}ms", debouncer.delay().as_millis());
        self.watch_loop(&observation, &debouncer);

        log!("serve"; "shutting down...");
        // Detector first, so a late change cannot trigger a restart
        observation.stop();
        self.lifecycle.stop();
        Ok(())
    }

    fn start_detector(&self) -> Result<Observation, WatchError> {
        let strategy = self.config.watch.strategy;
        match self.detector(strategy).observe() {
            Err(WatchError::Init(e))
                if strategy == WatchStrategy::Event && self.config.watch.fallback =>
            {
                log!("watch"; "event watcher unavailable ({e}), falling back to polling");
                self.detector(WatchStrategy::Poll).observe()
            }
            result => result,
        }
    }

    fn detector(&self, strategy: WatchStrategy) -> ChangeDetector {
        let watch = &self.config.watch;
        let filter = WatchFilter::new(
            normalize_path(&self.config.root),
            watch.extensions_for(strategy),
            watch.ignore.clone(),
        );
        ChangeDetector::new(strategy, filter, watch.interval())
    }

    fn watch_loop(&self, observation: &Observation, debouncer: &Debouncer) {
        loop {
            select! {
                recv(self.shutdown_rx) -> _ => break,
                recv(observation.events()) -> event => match event {
                    Ok(event) => debouncer.feed(event),
                    Err(_) => {
                        log!("watch"; "change detector stopped unexpectedly");
                        break;
                    }
                },
                default(debouncer.sleep_duration()) => {}
            }

            debouncer.on_trigger(|batch| self.restart(&batch));
        }
    }

    fn restart(&self, batch: &ChangeBatch) {
        let root = normalize_path(&self.config.root);
        let changed: Vec<String> = batch
            .paths()
            .iter()
            .map(|path| relative_display(path, &root))
            .collect();
        log!("watch"; "changed: {}", changed.join(", "));

        #[cfg(test)]
        if let Some(batches) = &self.batches {
            let _ = batches.send(batch.clone());
        }

        match self.lifecycle.restart() {
            Ok(()) => logger::status_success(&format!(
                "restarted http://{} ({} changed)",
                self.lifecycle.addr(),
                plural_count(batch.len(), "file")
            )),
            Err(e) => {
                let reason = e.to_string();
                let hint = SuperviseError::Bind(e).hint();
                logger::status_warning(&format!(
                    "restart failed, server is down until the next change: {reason}\n{hint}"
                ));
                logger::status_detach();
            }
        }
    }

    fn print_banner(&self, strategy: WatchStrategy) {
        let extensions: Vec<String> = self
            .config
            .watch
            .extensions_for(strategy)
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect();

        log!("serve"; "http://{}", self.lifecycle.addr().bold());
        log!("serve"; "serving from {}", self.config.root.display());
        log!("watch"; "watching {} ({})", extensions.join(" "), strategy.label());
        debug!("watch"; "ignoring {}", self.config.watch.ignore.join(", "));
        log!("serve"; "press Ctrl+C to stop");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::net::TcpListener;
    use std::path::Path;
    use std::sync::atomic::Ordering;
    use std::thread;
    use std::time::{Duration, Instant, SystemTime};

    use crossbeam::channel;
    use tempfile::TempDir;

    use crate::serve::testing::{CountingBackend, free_port};

    const WAIT: Duration = Duration::from_secs(5);

    fn make_config(root: &Path, port: u16) -> DevConfig {
        let mut config = DevConfig::default();
        config.root = root.to_path_buf();
        config.serve.port = port;
        config.serve.settle_ms = 10;
        config.watch.interval_ms = 30;
        config.watch.debounce_ms = Some(200);
        config
    }

    fn touch_later(path: &Path, secs: u64) {
        fs::write(path, format!("rewritten +{secs}")).unwrap();
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(secs))
            .unwrap();
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    struct Running {
        backend: CountingBackend,
        shutdown_tx: channel::Sender<()>,
        batches: channel::Receiver<ChangeBatch>,
        handle: thread::JoinHandle<Result<(), SuperviseError>>,
    }

    impl Running {
        fn starts(&self) -> usize {
            self.backend.counters.starts.load(Ordering::SeqCst)
        }

        fn shutdown(self) -> (CountingBackend, Result<(), SuperviseError>) {
            self.shutdown_tx.send(()).unwrap();
            let result = self.handle.join().unwrap();
            (self.backend, result)
        }
    }

    fn spawn_supervisor(config: DevConfig) -> Running {
        let backend = CountingBackend::default();
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        let (batches_tx, batches) = channel::unbounded();
        let mut supervisor = Supervisor::new(config, backend.clone(), shutdown_rx);
        supervisor.batches = Some(batches_tx);
        let handle = thread::spawn(move || supervisor.run());

        let running = Running {
            backend,
            shutdown_tx,
            batches,
            handle,
        };
        assert!(wait_for(|| running.starts() == 1));
        // Let the baseline scan finish before touching files
        thread::sleep(Duration::from_millis(300));
        running
    }

    #[test]
    fn test_rewrite_triggers_one_restart() {
        let temp = TempDir::new().unwrap();
        let index = temp.path().join("index.html");
        fs::write(&index, "v1").unwrap();

        let running = spawn_supervisor(make_config(temp.path(), free_port()));

        touch_later(&index, 5);
        assert!(wait_for(|| running.starts() == 2));

        // No extra restarts once things settle
        thread::sleep(Duration::from_millis(500));
        assert_eq!(running.starts(), 2);

        let (backend, result) = running.shutdown();
        assert!(result.is_ok());
        assert_eq!(backend.counters.live.load(Ordering::SeqCst), 0);
        assert_eq!(backend.counters.max_live.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_two_saves_in_window_restart_once() {
        let temp = TempDir::new().unwrap();
        let game = temp.path().join("game.js");
        let style = temp.path().join("style.css");
        fs::write(&game, "v1").unwrap();
        fs::write(&style, "v1").unwrap();

        let running = spawn_supervisor(make_config(temp.path(), free_port()));

        touch_later(&game, 5);
        thread::sleep(Duration::from_millis(50));
        touch_later(&style, 5);

        assert!(wait_for(|| running.starts() == 2));
        thread::sleep(Duration::from_millis(500));
        assert_eq!(running.starts(), 2);

        let batch = running.batches.recv_timeout(WAIT).unwrap();
        assert_eq!(batch.paths(), &[normalize_path(&game), normalize_path(&style)]);
        assert!(running.batches.try_recv().is_err());

        let (_, result) = running.shutdown();
        assert!(result.is_ok());
    }

    #[test]
    fn test_event_strategy_burst_restarts_once() {
        let temp = TempDir::new().unwrap();
        let mut config = make_config(temp.path(), free_port());
        config.watch.strategy = WatchStrategy::Event;
        config.watch.fallback = false;
        let script = temp.path().join("a.js");
        let style = temp.path().join("b.css");

        let running = spawn_supervisor(config);

        for round in 0..5 {
            fs::write(&script, format!("let round = {round};")).unwrap();
        }
        thread::sleep(Duration::from_millis(50));
        fs::write(&style, "body { margin: 0 }").unwrap();

        assert!(wait_for(|| running.starts() == 2));
        thread::sleep(Duration::from_millis(500));
        assert_eq!(running.starts(), 2);

        let batch = running.batches.recv_timeout(WAIT).unwrap();
        assert_eq!(batch.paths(), &[normalize_path(&script), normalize_path(&style)]);
        assert!(running.batches.try_recv().is_err());

        let (backend, result) = running.shutdown();
        assert!(result.is_ok());
        assert_eq!(backend.counters.max_live.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ignored_changes_never_restart() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("node_modules")).unwrap();
        let vendored = temp.path().join("node_modules/lib.js");
        let notes = temp.path().join("notes.txt");
        fs::write(&vendored, "v1").unwrap();
        fs::write(&notes, "v1").unwrap();

        let running = spawn_supervisor(make_config(temp.path(), free_port()));

        touch_later(&vendored, 5);
        touch_later(&notes, 5);
        thread::sleep(Duration::from_millis(600));
        assert_eq!(running.starts(), 1);

        let (_, result) = running.shutdown();
        assert!(result.is_ok());
    }

    #[test]
    fn test_port_in_use_aborts_before_start() {
        let temp = TempDir::new().unwrap();
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let backend = CountingBackend::default();
        let (_shutdown_tx, shutdown_rx) = channel::bounded(1);
        let supervisor = Supervisor::new(make_config(temp.path(), port), backend.clone(), shutdown_rx);

        let err = supervisor.run().unwrap_err();
        assert!(matches!(err, SuperviseError::PortInUse(PortInUse { port: p }) if p == port));
        assert!(err.hint().contains(&(port + 1).to_string()));
        assert_eq!(backend.counters.start_attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_startup_bind_error_is_fatal() {
        let temp = TempDir::new().unwrap();
        let backend = CountingBackend::failing_next(1);
        let (_shutdown_tx, shutdown_rx) = channel::bounded(1);
        let supervisor = Supervisor::new(
            make_config(temp.path(), free_port()),
            backend.clone(),
            shutdown_rx,
        );

        assert!(matches!(supervisor.run(), Err(SuperviseError::Bind(_))));
        assert_eq!(backend.counters.start_attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_restart_keeps_running() {
        let temp = TempDir::new().unwrap();
        let index = temp.path().join("index.html");
        fs::write(&index, "v1").unwrap();

        let running = spawn_supervisor(make_config(temp.path(), free_port()));
        running.backend.counters.fail_next.store(2, Ordering::SeqCst);

        touch_later(&index, 5);
        assert!(wait_for(|| {
            running.backend.counters.start_attempts.load(Ordering::SeqCst) == 3
        }));
        assert_eq!(running.backend.counters.live.load(Ordering::SeqCst), 0);

        // The next change brings the server back
        touch_later(&index, 10);
        assert!(wait_for(|| running.starts() == 2));

        let (_, result) = running.shutdown();
        assert!(result.is_ok());
    }

    #[test]
    fn test_event_watcher_falls_back_to_polling() {
        let temp = TempDir::new().unwrap();
        let mut config = make_config(temp.path(), free_port());
        // A root that does not exist makes the OS watcher fail to subscribe
        config.root = temp.path().join("missing");
        config.watch.strategy = WatchStrategy::Event;

        let backend = CountingBackend::default();
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        let supervisor = Supervisor::new(config, backend.clone(), shutdown_rx);
        shutdown_tx.send(()).unwrap();

        assert!(supervisor.run().is_ok());
        assert_eq!(backend.counters.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_event_watcher_without_fallback_aborts() {
        let temp = TempDir::new().unwrap();
        let mut config = make_config(temp.path(), free_port());
        config.root = temp.path().join("missing");
        config.watch.strategy = WatchStrategy::Event;
        config.watch.fallback = false;

        let backend = CountingBackend::default();
        let (_shutdown_tx, shutdown_rx) = channel::bounded(1);
        let supervisor = Supervisor::new(config, backend.clone(), shutdown_rx);

        let err = supervisor.run().unwrap_err();
        assert!(matches!(err, SuperviseError::Watch(WatchError::Init(_))));
        // The server started for the attempt is released again
        assert_eq!(backend.counters.live.load(Ordering::SeqCst), 0);
    }
}
