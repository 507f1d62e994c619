//! Error types for dirmirror
//!
//! Construction-time failures (bad paths, duplicate sources, bad config) are
//! returned to the caller. Runtime I/O failures during copy, clean and watch
//! are wrapped in these same variants but only ever surface through reports
//! and the log sink.

use crate::mirror::MappingId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dirmirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Error type for dirmirror operations
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Empty or otherwise unusable path argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A mapping with the same (normalized) source is already registered
    #[error("Source directory \"{}\" is already added", .0.display())]
    DuplicateSource(PathBuf),

    /// No mapping registered under this id
    #[error("Unknown mapping: {0}")]
    UnknownMapping(MappingId),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Destination entry exists and the mapping forbids overwriting it
    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// Copy target lies inside the copy source
    #[error("Cannot copy {} to a subdirectory of itself, {}", .src.display(), .dest.display())]
    SelfCopy { src: PathBuf, dest: PathBuf },

    /// `watch()` was called outside of a Tokio runtime
    #[error("Watching requires a running Tokio runtime")]
    NoRuntime,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem watcher errors
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Directory traversal errors
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<tokio::task::JoinError> for MirrorError {
    fn from(err: tokio::task::JoinError) -> Self {
        MirrorError::Other(format!("Background task failed: {}", err))
    }
}
