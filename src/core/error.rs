//! Error types for declaration_finder
//!
//! This module provides structured error handling using thiserror.
//! Cancellation is an error variant so it can travel through `?`, but callers
//! treat it as an expected outcome rather than a failure.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for finder operations
pub type Result<T> = std::result::Result<T, FinderError>;

/// Errors that can occur while searching for declarations
#[derive(Error, Debug)]
pub enum FinderError {
    /// The search was cancelled through its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// A name pattern could not be compiled into a query
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// IO error during index or config file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary encoding error for persisted symbol indexes
    #[error("Index encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// A persisted symbol index is unusable
    #[error("Symbol index error for {path}: {message}")]
    Index { path: PathBuf, message: String },

    /// Metadata image written in a format this crate does not read
    #[error("Unsupported metadata image format {found:#x}")]
    ImageFormat { found: u32 },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A background task panicked or was aborted
    #[error("Background task failed: {message}")]
    Task { message: String },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FinderError>,
    },
}

impl FinderError {
    /// Wrap an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FinderError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        FinderError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an index error for the given file
    pub fn index(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        FinderError::Index {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True if this error (or the error it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            FinderError::Cancelled => true,
            FinderError::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for FinderError {
    fn from(err: tokio::task::JoinError) -> Self {
        FinderError::Task {
            message: err.to_string(),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(ctx))
    }
}
