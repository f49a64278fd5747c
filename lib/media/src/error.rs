//! Error types for the media crate.

use std::fmt;

/// Errors from signing a single object path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// The path is not a valid object key.
    InvalidPath { path: String, reason: &'static str },
    /// The object does not exist.
    NotFound { path: String },
    /// The storage service refused or failed the request.
    Storage { reason: String },
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath { path, reason } => write!(f, "invalid object path '{path}': {reason}"),
            Self::NotFound { path } => write!(f, "object '{path}' not found"),
            Self::Storage { reason } => write!(f, "storage error: {reason}"),
        }
    }
}

impl std::error::Error for MediaError {}
