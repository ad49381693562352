//! Consumer lifecycle state.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a [`crate::consumer::FileWatchConsumer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl ConsumerState {
    fn as_u8(self) -> u8 {
        match self {
            ConsumerState::Stopped => 0,
            ConsumerState::Starting => 1,
            ConsumerState::Running => 2,
            ConsumerState::Stopping => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConsumerState::Starting,
            2 => ConsumerState::Running,
            3 => ConsumerState::Stopping,
            _ => ConsumerState::Stopped,
        }
    }
}

/// Atomic state cell with compare-and-swap transitions.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ConsumerState::Stopped.as_u8()))
    }

    pub(crate) fn get(&self) -> ConsumerState {
        ConsumerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Atomically move from `from` to `to`; false if not in `from`.
    pub(crate) fn transition(&self, from: ConsumerState, to: ConsumerState) -> bool {
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn set(&self, to: ConsumerState) {
        self.0.store(to.as_u8(), Ordering::SeqCst);
    }
}
