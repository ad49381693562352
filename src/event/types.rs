//! Event value types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileEventKind {
    Create,
    Modify,
    Delete,
}

impl FileEventKind {
    /// All kinds, in declaration order.
    pub const ALL: [FileEventKind; 3] = [
        FileEventKind::Create,
        FileEventKind::Modify,
        FileEventKind::Delete,
    ];

    /// Uppercase name as used in configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FileEventKind::Create => "CREATE",
            FileEventKind::Modify => "MODIFY",
            FileEventKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized event kind name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown event kind: {0} (expected CREATE, MODIFY or DELETE)")]
pub struct UnknownEventKind(pub String);

impl FromStr for FileEventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATE" => Ok(FileEventKind::Create),
            "MODIFY" => Ok(FileEventKind::Modify),
            "DELETE" => Ok(FileEventKind::Delete),
            _ => Err(UnknownEventKind(s.to_string())),
        }
    }
}

/// Immutable record of a single filesystem change.
///
/// Produced by the normalizer from raw native notifications and consumed
/// exactly once by a delivery worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEvent {
    /// Absolute path of the changed entry.
    pub path: PathBuf,
    /// Kind of change.
    pub kind: FileEventKind,
    /// When the notification was observed.
    pub timestamp: DateTime<Utc>,
}

impl FileEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(path: PathBuf, kind: FileEventKind) -> Self {
        Self {
            path,
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Event metadata handed to the downstream callback.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveredEvent {
    /// Kind of change.
    pub kind: FileEventKind,
    /// Absolute path of the changed entry.
    pub path: PathBuf,
    /// Path relative to the watch root.
    pub relative_path: PathBuf,
    /// Parent directory of the changed entry.
    pub parent: Option<PathBuf>,
    /// When the notification was observed.
    pub timestamp: DateTime<Utc>,
    /// Last-modified time of the entry, if it still exists.
    pub modified: Option<DateTime<Utc>>,
    /// Whether `path` is absolute.
    pub absolute: bool,
}

impl DeliveredEvent {
    /// Build delivery metadata for an event under the given watch root.
    #[must_use]
    pub fn from_event(event: &FileEvent, root: &Path) -> Self {
        let relative_path = event
            .path
            .strip_prefix(root)
            .map_or_else(|_| event.path.clone(), Path::to_path_buf);
        let modified = std::fs::metadata(&event.path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        Self {
            kind: event.kind,
            path: event.path.clone(),
            relative_path,
            parent: event.path.parent().map(Path::to_path_buf),
            timestamp: event.timestamp,
            modified,
            absolute: event.path.is_absolute(),
        }
    }
}
