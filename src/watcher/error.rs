//! Error types for the watch-tree system.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    Init { reason: String },

    #[error("Cannot set up watch tree at {path}: {reason}")]
    Setup { path: PathBuf, reason: String },

    #[error("Cannot watch directory {path}: {source}")]
    Register {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Cannot list directory {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to load config: {reason}")]
    Config { reason: String },
}

impl WatchError {
    /// Path the error is about, when there is one.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            WatchError::Setup { path, .. }
            | WatchError::Register { path, .. }
            | WatchError::List { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::Init {
            reason: e.to_string(),
        }
    }
}
