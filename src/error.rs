//! Error types for Inbox Pulse

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while scanning archives or building reports
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse archive {path}: {reason}")]
    ArchiveParse { path: PathBuf, reason: String },

    #[error("Conversation directory {0} has no message file")]
    MissingMessageFile(PathBuf),

    #[error("Inbox directory not found: {0}")]
    MissingInbox(PathBuf),

    #[error(
        "Invalid increment '{0}'. Must be an integer followed by a unit \
         (i.e., 1h = 1 hour, 2d = 2 days, 3m = 3 months)"
    )]
    InvalidIncrement(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Name pool is empty: {0}")]
    EmptyNamePool(PathBuf),

    #[error("Name pool exhausted: {needed} names needed but the pool holds {available}")]
    NamePoolExhausted { available: usize, needed: usize },

    #[error("No two-party conversations found for {0}")]
    NoConversations(String),

    #[error("Series for '{name}' has {actual} values but there are {expected} windows")]
    MisalignedSeries {
        name: String,
        expected: usize,
        actual: usize,
    },
}
