//! Pre-queue event filtering.
//!
//! Rejects events before they consume queue capacity, based on the
//! configured kind allow-set, recursion policy and include pattern.

mod glob;

pub use glob::AntInclude;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::event::{FileEvent, FileEventKind};

/// Filter applied to every normalized event before enqueueing.
#[derive(Debug)]
pub struct EventFilter {
    /// Canonicalized watch root.
    root: PathBuf,
    /// Allowed kinds; empty means all kinds pass.
    allowed: HashSet<FileEventKind>,
    recursive: bool,
    include: Option<AntInclude>,
}

impl EventFilter {
    #[must_use]
    pub fn new(
        root: PathBuf,
        allowed: HashSet<FileEventKind>,
        recursive: bool,
        include: Option<AntInclude>,
    ) -> Self {
        Self {
            root,
            allowed,
            recursive,
            include,
        }
    }

    /// Whether an event should be queued for delivery.
    pub fn accepts(&self, event: &FileEvent) -> bool {
        if !self.allowed.is_empty() && !self.allowed.contains(&event.kind) {
            return false;
        }

        let Ok(relative) = event.path.strip_prefix(&self.root) else {
            // Not under the root at all; some backends report events for
            // the root's parent after a rename.
            return false;
        };

        if !self.recursive && !self.is_direct_child(&event.path) {
            return false;
        }

        match &self.include {
            Some(include) => include.matches(relative),
            None => true,
        }
    }

    /// Whether the event path sits immediately under the watch root.
    ///
    /// Some backends report recursively regardless of the registration
    /// mode, so a non-recursive consumer enforces the policy here. Identity
    /// is resolved via canonicalization; an I/O failure during resolution
    /// rejects the event.
    fn is_direct_child(&self, path: &Path) -> bool {
        let Some(parent) = path.parent() else {
            return false;
        };
        if parent == self.root {
            return true;
        }
        match std::fs::canonicalize(parent) {
            Ok(resolved) => resolved == self.root,
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    %error,
                    "Could not resolve event parent, rejecting event"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FileEvent;

    fn event(path: PathBuf, kind: FileEventKind) -> FileEvent {
        FileEvent::new(path, kind)
    }

    fn all_kinds() -> HashSet<FileEventKind> {
        HashSet::new()
    }

    #[test]
    fn test_empty_allow_set_accepts_all_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let filter = EventFilter::new(root.clone(), all_kinds(), true, None);

        for kind in FileEventKind::ALL {
            assert!(filter.accepts(&event(root.join("a.txt"), kind)));
        }
    }

    #[test]
    fn test_allow_set_rejects_other_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let allowed = HashSet::from([FileEventKind::Delete]);
        let filter = EventFilter::new(root.clone(), allowed, true, None);

        assert!(filter.accepts(&event(root.join("a.txt"), FileEventKind::Delete)));
        assert!(!filter.accepts(&event(root.join("a.txt"), FileEventKind::Create)));
        assert!(!filter.accepts(&event(root.join("a.txt"), FileEventKind::Modify)));
    }

    #[test]
    fn test_non_recursive_rejects_subdirectory_events() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir(root.join("sub")).unwrap();
        let filter = EventFilter::new(root.clone(), all_kinds(), false, None);

        assert!(filter.accepts(&event(root.join("a.txt"), FileEventKind::Create)));
        assert!(!filter.accepts(&event(root.join("sub/b.txt"), FileEventKind::Create)));
    }

    #[test]
    fn test_recursive_accepts_subdirectory_events() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir(root.join("sub")).unwrap();
        let filter = EventFilter::new(root.clone(), all_kinds(), true, None);

        assert!(filter.accepts(&event(root.join("sub/b.txt"), FileEventKind::Create)));
    }

    #[test]
    fn test_non_recursive_rejects_when_parent_cannot_be_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let filter = EventFilter::new(root.clone(), all_kinds(), false, None);

        // Parent directory never existed, canonicalization fails.
        let path = root.join("missing-dir").join("b.txt");
        assert!(!filter.accepts(&event(path, FileEventKind::Delete)));
    }

    #[test]
    fn test_include_pattern_filters_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let include = AntInclude::new("**/*.csv").unwrap();
        let filter = EventFilter::new(root.clone(), all_kinds(), true, Some(include));

        assert!(filter.accepts(&event(root.join("data/x.csv"), FileEventKind::Create)));
        assert!(!filter.accepts(&event(root.join("data/x.txt"), FileEventKind::Create)));
    }

    #[test]
    fn test_event_outside_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let filter = EventFilter::new(root, all_kinds(), true, None);

        assert!(!filter.accepts(&event(PathBuf::from("/elsewhere/a.txt"), FileEventKind::Create)));
    }
}
