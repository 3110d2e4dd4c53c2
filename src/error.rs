//! Error handling for the Grid Lines viewer
//!
//! This module defines the crate error type and a Result alias. None of
//! these errors are fatal: the worst outcome of any of them is an empty
//! display that a fresh connect or subscribe recovers from.

use thiserror::Error;

/// Main error type for gridlines-rs operations
#[derive(Error, Debug)]
pub enum GridLinesError {
    /// Malformed connection string (bad nesting, empty server, ...)
    #[error("Connection string error: {0}")]
    ConnectionString(String),

    /// A required parameter was absent or empty
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// Requested operation is not valid from the current lifecycle state
    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: String,
    },

    /// A scale group was modified after it started updating
    #[error("Scale group '{0}' is frozen; members can only be added before the first update")]
    ScaleGroupFrozen(String),

    /// Presentation-only operation called from another thread
    #[error("{0} must be called on the presentation thread")]
    WrongThread(&'static str),

    /// Presentation context accessed while already in use
    #[error("Presentation context is already in use ({0})")]
    Reentrant(&'static str),

    /// Errors related to configuration loading/saving/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors reported by or about the measurement provider
    #[error("Provider error: {0}")]
    Provider(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<GridLinesError>,
    },
}

impl GridLinesError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        GridLinesError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error came from local input (connection string, missing
    /// field) rather than from the provider or the runtime.
    pub fn is_local_configuration(&self) -> bool {
        match self {
            GridLinesError::ConnectionString(_) | GridLinesError::MissingParameter(_) => true,
            GridLinesError::WithContext { source, .. } => source.is_local_configuration(),
            _ => false,
        }
    }
}

/// Result type alias for gridlines-rs operations
pub type Result<T> = std::result::Result<T, GridLinesError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
