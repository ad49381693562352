//! The file-watch consumer: native watch integration, poll threads and
//! the delivery worker pool, tied together by a lifecycle state machine.
//!
//! Data flow:
//!
//! ```text
//! native watch -> poll threads (normalize, dedup, filter) -> queue -> workers -> callback
//! ```

mod error;
mod state;
mod worker;

pub use error::WatchError;
pub use state::ConsumerState;
pub use worker::{DeliveryError, ErrorCallback, EventCallback};

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::WatchConfig;
use crate::event::{is_overflow, normalize, ChangeTracker};
use crate::filter::EventFilter;
use crate::queue::EventQueue;

use state::StateCell;
use worker::WorkerPool;

/// Resources owned by a running pipeline, released on stop.
struct RunningPipeline {
    root: PathBuf,
    watcher: RecommendedWatcher,
    queue: Arc<EventQueue>,
    poll_handles: Vec<JoinHandle<()>>,
    workers: WorkerPool,
}

/// Watches a directory tree and delivers filtered, deduplicated change
/// events to a downstream callback.
///
/// Delivery is at-most-effort: queue overflow and native buffer overflow
/// drop events with a warning rather than blocking the watch mechanism.
/// Callers needing guaranteed delivery must reconcile out of band.
pub struct FileWatchConsumer {
    config: WatchConfig,
    callback: Arc<EventCallback>,
    on_error: Arc<ErrorCallback>,
    state: StateCell,
    stopped: Arc<AtomicBool>,
    pipeline: Mutex<Option<RunningPipeline>>,
}

impl FileWatchConsumer {
    /// Create a stopped consumer with the default error handler, which
    /// logs callback failures as warnings.
    pub fn new<F>(config: WatchConfig, callback: F) -> Self
    where
        F: Fn(crate::event::DeliveredEvent) -> Result<(), DeliveryError> + Send + Sync + 'static,
    {
        Self {
            config,
            callback: Arc::new(callback),
            on_error: Arc::new(|event, error| {
                tracing::warn!(
                    path = %event.path.display(),
                    kind = %event.kind,
                    %error,
                    "Downstream callback failed"
                );
            }),
            state: StateCell::new(),
            stopped: Arc::new(AtomicBool::new(false)),
            pipeline: Mutex::new(None),
        }
    }

    /// Replace the handler invoked when the downstream callback fails.
    #[must_use]
    pub fn with_error_handler<F>(mut self, on_error: F) -> Self
    where
        F: Fn(&crate::event::DeliveredEvent, DeliveryError) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(on_error);
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConsumerState {
        self.state.get()
    }

    /// The configuration this consumer was built with.
    #[must_use]
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Canonicalized watch root, available while running.
    #[must_use]
    pub fn root(&self) -> Option<PathBuf> {
        let pipeline = self.pipeline.lock().unwrap_or_else(PoisonError::into_inner);
        pipeline.as_ref().map(|p| p.root.clone())
    }

    /// Number of events dropped so far due to a full queue.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        let pipeline = self.pipeline.lock().unwrap_or_else(PoisonError::into_inner);
        pipeline.as_ref().map_or(0, |p| p.queue.dropped())
    }

    /// Start watching.
    ///
    /// Validates the configuration, prepares the root directory, registers
    /// the native watch and spawns both thread pools.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::AlreadyRunning`] if not stopped, a
    /// configuration or root-preparation error, or a native watch
    /// registration failure. On error the consumer is left stopped.
    pub fn start(&self) -> Result<(), WatchError> {
        if !self.state.transition(ConsumerState::Stopped, ConsumerState::Starting) {
            return Err(WatchError::AlreadyRunning);
        }

        match self.start_pipeline() {
            Ok(pipeline) => {
                tracing::info!(
                    root = %pipeline.root.display(),
                    poll_threads = self.config.poll_threads,
                    workers = self.config.concurrent_consumers,
                    "File watch consumer started"
                );
                let mut slot = self.pipeline.lock().unwrap_or_else(PoisonError::into_inner);
                *slot = Some(pipeline);
                self.state.set(ConsumerState::Running);
                Ok(())
            }
            Err(error) => {
                self.state.set(ConsumerState::Stopped);
                Err(error)
            }
        }
    }

    /// Stop watching.
    ///
    /// Closes the native watch handle first, then shuts down the poll and
    /// worker pools. Events still queued are discarded. Stopping a consumer
    /// that is not running is a no-op.
    pub fn stop(&self) {
        if !self.state.transition(ConsumerState::Running, ConsumerState::Stopping) {
            return;
        }

        let pipeline = {
            let mut slot = self.pipeline.lock().unwrap_or_else(PoisonError::into_inner);
            slot.take()
        };

        if let Some(mut pipeline) = pipeline {
            // Close the native handle before signalling the threads so no
            // further raw events arrive. Unwatch errors are best-effort.
            if let Err(error) = pipeline.watcher.unwatch(&pipeline.root) {
                tracing::warn!(%error, "Failed to unregister native watch");
            }
            drop(pipeline.watcher);

            self.stopped.store(true, Ordering::SeqCst);
            for handle in pipeline.poll_handles {
                if handle.join().is_err() {
                    tracing::warn!("Watch poll thread panicked");
                }
            }
            pipeline.workers.join();

            let discarded = pipeline.queue.len();
            if discarded > 0 {
                tracing::debug!(discarded, "Discarding undelivered events");
            }
            tracing::info!(
                root = %pipeline.root.display(),
                dropped = pipeline.queue.dropped(),
                "File watch consumer stopped"
            );
        }

        self.state.set(ConsumerState::Stopped);
    }

    fn start_pipeline(&self) -> Result<RunningPipeline, WatchError> {
        self.config.validate()?;
        let root = self.prepare_root()?;

        self.stopped.store(false, Ordering::SeqCst);

        let filter = Arc::new(EventFilter::new(
            root.clone(),
            self.config.events.clone(),
            self.config.recursive,
            self.config.include()?,
        ));
        let tracker = Arc::new(ChangeTracker::new(self.config.hash_strategy()));
        let queue = Arc::new(EventQueue::new(self.config.queue_size));
        let poll_timeout = Duration::from_millis(self.config.poll_timeout_ms);

        // The native watcher pushes raw results into a channel shared by
        // the poll threads; the channel disconnects when the watcher drops.
        let (raw_tx, raw_rx) = crossbeam_channel::unbounded::<notify::Result<notify::Event>>();
        let mut watcher = notify::recommended_watcher(move |result| {
            let _ = raw_tx.send(result);
        })?;

        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&root, mode)?;

        let mut poll_handles = Vec::with_capacity(self.config.poll_threads);
        for index in 0..self.config.poll_threads {
            let raw_rx = raw_rx.clone();
            let filter = Arc::clone(&filter);
            let tracker = Arc::clone(&tracker);
            let queue = Arc::clone(&queue);
            let stopped = Arc::clone(&self.stopped);
            let handle = thread::Builder::new()
                .name(format!("filewatch-poll-{index}"))
                .spawn(move || {
                    poll_loop(&raw_rx, &filter, &tracker, &queue, &stopped, poll_timeout);
                })?;
            poll_handles.push(handle);
        }

        let workers = WorkerPool::spawn(
            self.config.concurrent_consumers,
            root.clone(),
            Arc::clone(&queue),
            Arc::clone(&self.callback),
            Arc::clone(&self.on_error),
            Arc::clone(&self.stopped),
            poll_timeout,
        )?;

        Ok(RunningPipeline {
            root,
            watcher,
            queue,
            poll_handles,
            workers,
        })
    }

    /// Validate the root directory, creating it when configured to.
    fn prepare_root(&self) -> Result<PathBuf, WatchError> {
        let path = &self.config.path;
        if !path.exists() {
            if !self.config.auto_create {
                return Err(WatchError::RootMissing(path.clone()));
            }
            tracing::debug!(path = %path.display(), "Creating watch root");
            std::fs::create_dir_all(path)?;
        }
        if !path.is_dir() {
            return Err(WatchError::NotADirectory(path.clone()));
        }
        Ok(std::fs::canonicalize(path)?)
    }
}

impl Drop for FileWatchConsumer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for FileWatchConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatchConsumer")
            .field("path", &self.config.path)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

/// Drain raw native notifications into the bounded queue.
///
/// Runs until the stop flag is raised or the raw channel disconnects
/// (which happens when the native watcher is dropped during stop).
fn poll_loop(
    raw_rx: &Receiver<notify::Result<notify::Event>>,
    filter: &EventFilter,
    tracker: &ChangeTracker,
    queue: &EventQueue,
    stopped: &AtomicBool,
    poll_timeout: Duration,
) {
    while !stopped.load(Ordering::SeqCst) {
        match raw_rx.recv_timeout(poll_timeout) {
            Ok(Ok(raw)) => {
                if is_overflow(&raw) {
                    // The native layer does not replay missed events, so
                    // there is nothing to retry.
                    tracing::warn!("Native watch buffer overflowed, events were lost");
                }
                for event in normalize(&raw) {
                    if !tracker.observe(&event) {
                        tracing::trace!(
                            path = %event.path.display(),
                            "Suppressing duplicate notification"
                        );
                        continue;
                    }
                    if !filter.accepts(&event) {
                        continue;
                    }
                    queue.offer(event);
                }
            }
            Ok(Err(error)) => {
                tracing::warn!(%error, "Native watch error");
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::trace!("Watch poll thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FileEventKind;

    fn noop_consumer(config: WatchConfig) -> FileWatchConsumer {
        FileWatchConsumer::new(config, |_| Ok(()))
    }

    #[test]
    fn test_missing_root_without_auto_create_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WatchConfig::new(dir.path().join("missing"));
        config.auto_create = false;

        let consumer = noop_consumer(config);
        let result = consumer.start();
        assert!(matches!(result, Err(WatchError::RootMissing(_))));
        assert_eq!(consumer.state(), ConsumerState::Stopped);
    }

    #[test]
    fn test_file_root_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();

        let consumer = noop_consumer(WatchConfig::new(file));
        let result = consumer.start();
        assert!(matches!(result, Err(WatchError::NotADirectory(_))));
        assert_eq!(consumer.state(), ConsumerState::Stopped);
    }

    #[test]
    fn test_invalid_config_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WatchConfig::new(dir.path());
        config.poll_threads = 0;

        let consumer = noop_consumer(config);
        assert!(matches!(consumer.start(), Err(WatchError::Config(_))));
        assert_eq!(consumer.state(), ConsumerState::Stopped);
    }

    #[test]
    fn test_stop_when_not_running_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let consumer = noop_consumer(WatchConfig::new(dir.path()));
        consumer.stop();
        assert_eq!(consumer.state(), ConsumerState::Stopped);
    }

    #[test]
    fn test_start_stop_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WatchConfig::new(dir.path());
        config.poll_timeout_ms = 20;

        let consumer = noop_consumer(config);
        match consumer.start() {
            Ok(()) => {}
            Err(WatchError::Notify(e)) => {
                // Skip when the host has exhausted its watch descriptors.
                eprintln!("Skipping test due to system limit: {e}");
                return;
            }
            Err(e) => panic!("Unexpected error: {e}"),
        }
        assert_eq!(consumer.state(), ConsumerState::Running);
        assert!(consumer.root().is_some());

        // Starting twice is rejected.
        assert!(matches!(consumer.start(), Err(WatchError::AlreadyRunning)));

        consumer.stop();
        assert_eq!(consumer.state(), ConsumerState::Stopped);
        assert!(consumer.root().is_none());

        // Restart after stop works.
        if consumer.start().is_ok() {
            assert_eq!(consumer.state(), ConsumerState::Running);
            consumer.stop();
        }
    }

    #[test]
    fn test_auto_create_builds_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("created");
        let mut config = WatchConfig::new(&root);
        config.poll_timeout_ms = 20;
        config.events = [FileEventKind::Create].into_iter().collect();

        let consumer = noop_consumer(config);
        match consumer.start() {
            Ok(()) => {}
            Err(WatchError::Notify(e)) => {
                eprintln!("Skipping test due to system limit: {e}");
                return;
            }
            Err(e) => panic!("Unexpected error: {e}"),
        }
        assert!(root.is_dir());
        consumer.stop();
    }
}
