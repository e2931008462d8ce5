//! Error types for the configuration and navigation subsystems

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigLevel;
use crate::navigation::ViewModelKind;

/// Failures surfaced by the configuration subsystem
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration was read before the first load
    #[error("configuration has not been loaded yet")]
    NotInitialized,

    #[error("operation is not supported for the {0} configuration level")]
    UnsupportedLevel(ConfigLevel),

    #[error("failed to access config file {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking I/O task was cancelled or panicked
    #[error("background config task failed: {0}")]
    Background(String),
}

impl ConfigError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Failures while producing a view-model instance
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no registration for view-model {0:?}")]
    NotRegistered(ViewModelKind),

    #[error("factory for view-model {kind:?} failed: {reason}")]
    FactoryFailed { kind: ViewModelKind, reason: String },
}

/// Failures of a single navigation request
#[derive(Debug, Error)]
pub enum NavigationError {
    /// No host has been registered with `set_navigation_target`
    #[error("no navigation target has been registered")]
    TargetMissing,

    /// The UI loop that owns the host was shut down
    #[error("the UI context is no longer running")]
    UiContextClosed,

    #[error("the navigation worker has stopped")]
    WorkerStopped,

    #[error("no tokio runtime is available for the navigation worker")]
    NoRuntime,

    #[error("navigation task failed: {0}")]
    Panicked(String),
}
