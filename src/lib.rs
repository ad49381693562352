//! Filewatch - directory-watch event consumer with dedup, filtering and a
//! bounded delivery queue.
//!
//! ```no_run
//! use filewatch::{FileWatchConsumer, WatchConfig};
//!
//! let config = WatchConfig::new("/var/inbox");
//! let consumer = FileWatchConsumer::new(config, |event| {
//!     println!("{} {}", event.kind, event.relative_path.display());
//!     Ok(())
//! });
//! consumer.start()?;
//! # consumer.stop();
//! # Ok::<(), filewatch::WatchError>(())
//! ```

pub mod config;
pub mod consumer;
pub mod event;
pub mod filter;
pub mod queue;
pub mod registry;

pub use config::{ConfigError, ConfigLoader, WatchConfig};
pub use consumer::{
    ConsumerState, DeliveryError, ErrorCallback, EventCallback, FileWatchConsumer, WatchError,
};
pub use event::{ChangeTracker, DeliveredEvent, FileEvent, FileEventKind, HashStrategy};
pub use filter::{AntInclude, EventFilter};
pub use queue::EventQueue;
pub use registry::WatcherRegistry;
