//! Normalization of raw native notifications.
//!
//! Maps the `notify` crate's event taxonomy onto the three kinds this
//! pipeline delivers. Renames are split into a delete of the old name and
//! a create of the new one, so downstream consumers never see a rename.

use notify::event::{EventKind, ModifyKind, RenameMode};

use super::types::{FileEvent, FileEventKind};

/// Convert a raw native notification into zero or more events, one per
/// affected path.
///
/// Access events and notifications with no usable kind are discarded here
/// rather than burdening the filter stage.
#[must_use]
pub fn normalize(raw: &notify::Event) -> Vec<FileEvent> {
    match raw.kind {
        EventKind::Create(_) => events_for_all_paths(raw, FileEventKind::Create),
        EventKind::Remove(_) => events_for_all_paths(raw, FileEventKind::Delete),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            events_for_all_paths(raw, FileEventKind::Delete)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            events_for_all_paths(raw, FileEventKind::Create)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // First path is the old name, second the new one.
            let mut events = Vec::with_capacity(2);
            if let Some(from) = raw.paths.first() {
                events.push(FileEvent::new(from.clone(), FileEventKind::Delete));
            }
            if let Some(to) = raw.paths.get(1) {
                events.push(FileEvent::new(to.clone(), FileEventKind::Create));
            }
            events
        }
        EventKind::Modify(_) => events_for_all_paths(raw, FileEventKind::Modify),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// Whether the native layer signalled that its internal buffer overflowed
/// and notifications were lost.
#[must_use]
pub fn is_overflow(raw: &notify::Event) -> bool {
    raw.need_rescan()
}

fn events_for_all_paths(raw: &notify::Event, kind: FileEventKind) -> Vec<FileEvent> {
    raw.paths
        .iter()
        .map(|path| FileEvent::new(path.clone(), kind))
        .collect()
}
