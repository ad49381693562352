//! Event model: normalized change records, native-event normalization and
//! duplicate suppression.

mod dedup;
mod normalize;
mod types;

pub use dedup::{ChangeTracker, HashStrategy};
pub use normalize::{is_overflow, normalize};
pub use types::{DeliveredEvent, FileEvent, FileEventKind, UnknownEventKind};
