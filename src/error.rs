//! Error handling for the TempLog-RS engine
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.

use thiserror::Error;

/// Main error type for TempLog-RS operations
#[derive(Error, Debug)]
pub enum TempLogError {
    /// Errors related to the sensor bus (discovery or read transactions)
    #[error("Sensor bus error: {0}")]
    Bus(String),

    /// A sensor bus transaction exceeded its deadline
    #[error("Bus timeout after {timeout_ms} ms")]
    BusTimeout { timeout_ms: u64 },

    /// Errors related to the durable sample journal
    #[error("Journal error: {0}")]
    Journal(String),

    /// The durable storage could not be mounted at startup
    #[error("Storage mount failed: {0}")]
    StorageMount(String),

    /// Errors related to settings loading/saving
    #[error("Settings error: {0}")]
    Settings(String),

    /// Errors related to channel communication between tasks
    #[error("Channel error: {0}")]
    Channel(String),

    /// Invalid construction parameters (e.g. a zero-capacity ring)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

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
        source: Box<TempLogError>,
    },
}

impl TempLogError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TempLogError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for TempLogError {
    fn from(err: serde_json::Error) -> Self {
        TempLogError::Serialization(err.to_string())
    }
}

/// Result type alias for TempLog-RS operations
pub type Result<T> = std::result::Result<T, TempLogError>;

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
