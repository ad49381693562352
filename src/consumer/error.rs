//! Consumer error types.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Errors that can occur while starting or stopping a watch consumer.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Watch root does not exist and auto-create is disabled.
    #[error("Watch root does not exist: {0}")]
    RootMissing(PathBuf),

    /// Watch root exists but is not a directory.
    #[error("Watch root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The consumer is already running.
    #[error("Consumer is already running")]
    AlreadyRunning,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Native watcher error.
    #[error("Native watch error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_missing_display() {
        let err = WatchError::RootMissing(PathBuf::from("/tmp/gone"));
        assert_eq!(err.to_string(), "Watch root does not exist: /tmp/gone");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: WatchError = io_err.into();
        assert!(matches!(err, WatchError::Io(_)));
    }

    #[test]
    fn test_from_notify_error() {
        let err: WatchError = notify::Error::generic("boom").into();
        assert!(err.to_string().contains("Native watch error"));
    }

    #[test]
    fn test_from_config_error() {
        let err: WatchError = ConfigError::ZeroValue { field: "poll_threads" }.into();
        assert!(err.to_string().contains("poll_threads"));
    }
}
