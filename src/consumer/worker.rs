//! Delivery worker pool.
//!
//! Each worker loops on a timed queue poll and invokes the downstream
//! callback synchronously. A callback failure is routed to the error
//! handler and the worker keeps going; only the stop flag ends the loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::event::DeliveredEvent;
use crate::queue::EventQueue;

/// Error produced by a downstream callback.
pub type DeliveryError = Box<dyn std::error::Error + Send + Sync>;

/// Downstream consumer callback.
pub type EventCallback = dyn Fn(DeliveredEvent) -> Result<(), DeliveryError> + Send + Sync;

/// Handler for callback failures.
pub type ErrorCallback = dyn Fn(&DeliveredEvent, DeliveryError) + Send + Sync;

/// Fixed set of delivery worker threads draining the event queue.
#[derive(Debug)]
pub(crate) struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers.
    pub(crate) fn spawn(
        count: usize,
        root: PathBuf,
        queue: Arc<EventQueue>,
        callback: Arc<EventCallback>,
        on_error: Arc<ErrorCallback>,
        stopped: Arc<AtomicBool>,
        poll_timeout: Duration,
    ) -> std::io::Result<Self> {
        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
            let root = root.clone();
            let queue = Arc::clone(&queue);
            let callback = Arc::clone(&callback);
            let on_error = Arc::clone(&on_error);
            let stopped = Arc::clone(&stopped);
            let handle = thread::Builder::new()
                .name(format!("filewatch-worker-{index}"))
                .spawn(move || {
                    worker_loop(&root, &queue, &*callback, &*on_error, &stopped, poll_timeout);
                })?;
            handles.push(handle);
        }
        Ok(Self { handles })
    }

    /// Wait for all workers to exit. Call after raising the stop flag.
    pub(crate) fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                tracing::warn!("Delivery worker panicked");
            }
        }
    }
}

fn worker_loop(
    root: &std::path::Path,
    queue: &EventQueue,
    callback: &EventCallback,
    on_error: &ErrorCallback,
    stopped: &AtomicBool,
    poll_timeout: Duration,
) {
    while !stopped.load(Ordering::SeqCst) {
        let Some(event) = queue.poll(poll_timeout) else {
            continue;
        };
        let delivered = DeliveredEvent::from_event(&event, root);
        tracing::trace!(
            path = %delivered.path.display(),
            kind = %delivered.kind,
            "Delivering event"
        );
        if let Err(error) = callback(delivered.clone()) {
            on_error(&delivered, error);
        }
    }
    tracing::trace!("Delivery worker exiting");
}
