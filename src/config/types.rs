//! Configuration types.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::event::{FileEventKind, HashStrategy};
use crate::filter::AntInclude;

/// Configuration for a watch consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Root directory to watch.
    pub path: PathBuf,
    /// Event kinds to deliver. Empty means all kinds.
    #[serde(default = "default_events")]
    pub events: HashSet<FileEventKind>,
    /// Create `path` if it does not exist.
    #[serde(default = "default_true")]
    pub auto_create: bool,
    /// Watch subdirectories.
    #[serde(default = "default_true")]
    pub recursive: bool,
    /// Delivery worker thread count.
    #[serde(default = "default_one")]
    pub concurrent_consumers: usize,
    /// Native watch poll thread count.
    #[serde(default = "default_one")]
    pub poll_threads: usize,
    /// Ant-style include pattern, relative to `path`. None matches all.
    #[serde(default)]
    pub ant_include: Option<String>,
    /// Queue capacity. None is effectively unbounded.
    #[serde(default)]
    pub queue_size: Option<usize>,
    /// Enable duplicate-notification suppression.
    #[serde(default = "default_true")]
    pub use_file_hashing: bool,
    /// Fingerprint strategy used when hashing is enabled.
    #[serde(default)]
    pub file_hasher: HashStrategy,
    /// Timed-poll interval; bounds how long shutdown takes to observe.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

fn default_events() -> HashSet<FileEventKind> {
    FileEventKind::ALL.into_iter().collect()
}

fn default_true() -> bool {
    true
}

fn default_one() -> usize {
    1
}

fn default_poll_timeout_ms() -> u64 {
    200
}

impl WatchConfig {
    /// Configuration with defaults for the given root.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            events: default_events(),
            auto_create: default_true(),
            recursive: default_true(),
            concurrent_consumers: default_one(),
            poll_threads: default_one(),
            ant_include: None,
            queue_size: None,
            use_file_hashing: default_true(),
            file_hasher: HashStrategy::default(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }

    /// Effective dedup strategy, honoring the `use_file_hashing` switch.
    #[must_use]
    pub fn hash_strategy(&self) -> HashStrategy {
        if self.use_file_hashing {
            self.file_hasher
        } else {
            HashStrategy::Disabled
        }
    }

    /// Compile the include pattern, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Pattern`] for a malformed pattern.
    pub fn include(&self) -> Result<Option<AntInclude>, ConfigError> {
        match &self.ant_include {
            None => Ok(None),
            Some(pattern) => AntInclude::new(pattern)
                .map(Some)
                .map_err(|source| ConfigError::Pattern {
                    pattern: pattern.clone(),
                    source,
                }),
        }
    }

    /// Validate field values. Startup-fatal on failure.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrent_consumers == 0 {
            return Err(ConfigError::ZeroValue {
                field: "concurrent_consumers",
            });
        }
        if self.poll_threads == 0 {
            return Err(ConfigError::ZeroValue {
                field: "poll_threads",
            });
        }
        if self.queue_size == Some(0) {
            return Err(ConfigError::ZeroValue { field: "queue_size" });
        }
        if self.poll_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue {
                field: "poll_timeout_ms",
            });
        }
        self.include()?;
        Ok(())
    }
}

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid include pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        source: globset::Error,
    },

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },
}
