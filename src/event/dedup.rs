//! Duplicate-notification suppression.
//!
//! Native watch services commonly report the same logical change more than
//! once (a create followed by a spurious modify, or two modifies for one
//! write). The tracker hashes file content or metadata and drops events
//! whose digest matches the previous one for the same path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::types::{FileEvent, FileEventKind};

/// How to fingerprint a file when deduplicating notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashStrategy {
    /// No deduplication; every surviving notification is delivered.
    Disabled,
    /// Hash the file content (blake3). Strongest suppression, costs a read.
    #[default]
    Contents,
    /// Use the last-modified timestamp. Cheap, but misses same-second writes.
    ModifiedTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Digest {
    Contents([u8; 32]),
    ModifiedTime(SystemTime),
}

/// Per-consumer dedup state, shared by all poll threads.
#[derive(Debug)]
pub struct ChangeTracker {
    strategy: HashStrategy,
    seen: Mutex<HashMap<PathBuf, Digest>>,
}

impl ChangeTracker {
    #[must_use]
    pub fn new(strategy: HashStrategy) -> Self {
        Self {
            strategy,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record an event and report whether it represents a new logical change.
    ///
    /// Returns `false` only when the event's digest matches the previously
    /// recorded digest for the same path. Events whose file cannot be read
    /// are always treated as new, since no duplicate can be proven.
    pub fn observe(&self, event: &FileEvent) -> bool {
        if self.strategy == HashStrategy::Disabled {
            return true;
        }

        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        match event.kind {
            FileEventKind::Delete => {
                seen.remove(&event.path);
                true
            }
            FileEventKind::Create | FileEventKind::Modify => {
                let Some(digest) = self.digest(&event.path) else {
                    seen.remove(&event.path);
                    return true;
                };
                match seen.insert(event.path.clone(), digest.clone()) {
                    Some(previous) if previous == digest => false,
                    _ => true,
                }
            }
        }
    }

    fn digest(&self, path: &Path) -> Option<Digest> {
        match self.strategy {
            HashStrategy::Disabled => None,
            HashStrategy::Contents => {
                let bytes = std::fs::read(path).ok()?;
                Some(Digest::Contents(*blake3::hash(&bytes).as_bytes()))
            }
            HashStrategy::ModifiedTime => std::fs::metadata(path)
                .and_then(|m| m.modified())
                .ok()
                .map(Digest::ModifiedTime),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(path: &Path, kind: FileEventKind) -> FileEvent {
        FileEvent::new(path.to_path_buf(), kind)
    }

    #[test]
    fn test_repeated_notification_for_unchanged_content_is_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"one").unwrap();

        let tracker = ChangeTracker::new(HashStrategy::Contents);
        assert!(tracker.observe(&event(&path, FileEventKind::Modify)));
        assert!(!tracker.observe(&event(&path, FileEventKind::Modify)));
    }

    #[test]
    fn test_changed_content_is_delivered_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"one").unwrap();

        let tracker = ChangeTracker::new(HashStrategy::Contents);
        assert!(tracker.observe(&event(&path, FileEventKind::Modify)));

        std::fs::write(&path, b"two").unwrap();
        assert!(tracker.observe(&event(&path, FileEventKind::Modify)));
    }

    #[test]
    fn test_disabled_strategy_never_suppresses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"one").unwrap();

        let tracker = ChangeTracker::new(HashStrategy::Disabled);
        assert!(tracker.observe(&event(&path, FileEventKind::Modify)));
        assert!(tracker.observe(&event(&path, FileEventKind::Modify)));
    }

    #[test]
    fn test_delete_clears_state_so_recreate_is_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"one").unwrap();

        let tracker = ChangeTracker::new(HashStrategy::Contents);
        assert!(tracker.observe(&event(&path, FileEventKind::Create)));

        std::fs::remove_file(&path).unwrap();
        assert!(tracker.observe(&event(&path, FileEventKind::Delete)));

        std::fs::write(&path, b"one").unwrap();
        assert!(tracker.observe(&event(&path, FileEventKind::Create)));
    }

    #[test]
    fn test_unreadable_file_is_always_delivered() {
        let tracker = ChangeTracker::new(HashStrategy::Contents);
        let path = PathBuf::from("/nonexistent/filewatch-test/a.txt");
        assert!(tracker.observe(&event(&path, FileEventKind::Modify)));
        assert!(tracker.observe(&event(&path, FileEventKind::Modify)));
    }

    #[test]
    fn test_modified_time_strategy_suppresses_same_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"one").unwrap();

        let tracker = ChangeTracker::new(HashStrategy::ModifiedTime);
        assert!(tracker.observe(&event(&path, FileEventKind::Modify)));
        // No write in between, mtime unchanged.
        assert!(!tracker.observe(&event(&path, FileEventKind::Modify)));
    }
}
