//! Shared-consumer registry.
//!
//! Applications watching the same root from several places share one
//! running consumer instead of registering duplicate native watches. The
//! registry is an explicitly passed object owned by the host application,
//! with reference-counted acquire/release semantics: the first acquire for
//! a root creates and starts the consumer, the last release stops it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::consumer::{FileWatchConsumer, WatchError};

/// Reference-counted slot for one watch root.
#[derive(Debug)]
struct Entry {
    refs: usize,
    consumer: Arc<FileWatchConsumer>,
}

/// Registry of running consumers keyed by watch root.
///
/// Keys are resolved to absolute paths without following symlinks, so two
/// symlinked aliases of the same directory are distinct roots.
#[derive(Debug, Default)]
pub struct WatcherRegistry {
    entries: Mutex<HashMap<PathBuf, Entry>>,
}

impl WatcherRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a consumer for `root`, creating and starting one via
    /// `create` if none is registered yet.
    ///
    /// # Errors
    ///
    /// Propagates creation and startup failures; on failure nothing is
    /// registered.
    pub fn acquire<F>(&self, root: &Path, create: F) -> Result<Arc<FileWatchConsumer>, WatchError>
    where
        F: FnOnce() -> Result<FileWatchConsumer, WatchError>,
    {
        let key = Self::key_for(root);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = entries.get_mut(&key) {
            entry.refs += 1;
            tracing::debug!(root = %key.display(), refs = entry.refs, "Reusing shared consumer");
            return Ok(Arc::clone(&entry.consumer));
        }

        let consumer = create()?;
        consumer.start()?;
        let consumer = Arc::new(consumer);
        entries.insert(
            key.clone(),
            Entry {
                refs: 1,
                consumer: Arc::clone(&consumer),
            },
        );
        tracing::debug!(root = %key.display(), "Registered shared consumer");
        Ok(consumer)
    }

    /// Release one reference to the consumer for `root`.
    ///
    /// Returns `true` when this was the last reference and the consumer
    /// was stopped and removed. Releasing an unregistered root is a no-op
    /// returning `false`.
    pub fn release(&self, root: &Path) -> bool {
        let key = Self::key_for(root);
        let removed = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            match entries.get_mut(&key) {
                None => None,
                Some(entry) if entry.refs > 1 => {
                    entry.refs -= 1;
                    tracing::debug!(root = %key.display(), refs = entry.refs, "Released shared consumer");
                    None
                }
                Some(_) => entries.remove(&key),
            }
        };

        match removed {
            Some(entry) => {
                tracing::debug!(root = %key.display(), "Stopping last shared consumer");
                entry.consumer.stop();
                true
            }
            None => false,
        }
    }

    /// Current reference count for `root`, if registered.
    #[must_use]
    pub fn refs(&self, root: &Path) -> Option<usize> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&Self::key_for(root)).map(|entry| entry.refs)
    }

    /// Number of registered roots.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key_for(root: &Path) -> PathBuf {
        std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf())
    }
}
