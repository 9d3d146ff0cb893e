//! Error types for flatmirror

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for mirror operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create target directory {}: {source}", .path.display())]
    TargetRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Pass task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Scheduler stopped")]
    SchedulerStopped,
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must end the process instead of only the current pass
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::TargetRoot { .. } | Error::Configuration { .. })
    }
}

/// Result type alias for mirror operations
pub type Result<T> = std::result::Result<T, Error>;
