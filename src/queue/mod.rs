//! Bounded event queue between poll threads and delivery workers.
//!
//! Enqueueing is a non-blocking best-effort offer: the native watch API has
//! no flow-control primitive, so a full queue drops the event rather than
//! blocking the watch thread. Workers drain with a timed poll so a stop
//! signal is observed within one timeout interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::event::FileEvent;

/// Thread-safe FIFO of pending events.
///
/// A capacity of `None` means effectively unbounded.
#[derive(Debug)]
pub struct EventQueue {
    tx: Sender<FileEvent>,
    rx: Receiver<FileEvent>,
    capacity: Option<usize>,
    dropped: AtomicU64,
}

impl EventQueue {
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        let (tx, rx) = match capacity {
            Some(size) => crossbeam_channel::bounded(size),
            None => crossbeam_channel::unbounded(),
        };
        Self {
            tx,
            rx,
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Offer an event without blocking.
    ///
    /// Returns `false` when the queue is full (the event is dropped and
    /// counted) or the queue has been shut down.
    pub fn offer(&self, event: FileEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    path = %event.path.display(),
                    kind = %event.kind,
                    "Event queue full, dropping event"
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Wait up to `timeout` for the next event.
    pub fn poll(&self, timeout: Duration) -> Option<FileEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Number of events currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Configured capacity, if bounded.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of events dropped due to a full queue.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FileEventKind;
    use std::path::PathBuf;
    use std::time::Instant;

    fn event(name: &str) -> FileEvent {
        FileEvent::new(PathBuf::from(name), FileEventKind::Create)
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let queue = EventQueue::new(Some(3));
        for i in 0..8 {
            queue.offer(event(&format!("/tmp/{i}")));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dropped(), 5);
    }

    #[test]
    fn test_full_queue_offer_does_not_block() {
        let queue = EventQueue::new(Some(1));
        assert!(queue.offer(event("/tmp/a")));

        let start = Instant::now();
        assert!(!queue.offer(event("/tmp/b")));
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_fifo_order() {
        let queue = EventQueue::new(Some(8));
        queue.offer(event("/tmp/a"));
        queue.offer(event("/tmp/b"));

        let first = queue.poll(Duration::from_millis(10)).unwrap();
        let second = queue.poll(Duration::from_millis(10)).unwrap();
        assert_eq!(first.path, PathBuf::from("/tmp/a"));
        assert_eq!(second.path, PathBuf::from("/tmp/b"));
    }

    #[test]
    fn test_poll_times_out_on_empty_queue() {
        let queue = EventQueue::new(Some(1));
        assert!(queue.poll(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_unbounded_queue_accepts_many() {
        let queue = EventQueue::new(None);
        for i in 0..10_000 {
            assert!(queue.offer(event(&format!("/tmp/{i}"))));
        }
        assert_eq!(queue.len(), 10_000);
        assert_eq!(queue.dropped(), 0);
        assert!(queue.capacity().is_none());
    }
}
