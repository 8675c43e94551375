//! Error types for the reforge advisory engine.
//!
//! Configuration and invariant violations fail fast at construction;
//! per-pattern and per-table failures are caught at the smallest scope and
//! surfaced through the pipeline result's error list instead of aborting.

use thiserror::Error;

/// The primary error type for reforge operations.
#[derive(Error, Debug)]
pub enum ReforgeError {
    /// Invalid configuration (weights, unit costs, thresholds)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Pattern invariant violation (confidence range, empty identifiers)
    #[error("Pattern error: {message}")]
    Pattern { message: String },

    /// Cost estimation error
    #[error("Cost estimation error: {message}")]
    Estimation { message: String },

    /// Tradeoff/conflict analysis error
    #[error("Analysis error: {message}")]
    Analysis { message: String },

    /// Workload/schema collection failure (upstream collaborator)
    #[error("Collection error: {message}")]
    Collection { message: String },

    /// SQL generation failure (upstream collaborator)
    #[error("SQL generation error: {message}")]
    Generation { message: String },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Internal error (bug in the engine)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ReforgeError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a pattern invariant error.
    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern {
            message: message.into(),
        }
    }

    /// Create a cost estimation error.
    pub fn estimation(message: impl Into<String>) -> Self {
        Self::Estimation {
            message: message.into(),
        }
    }

    /// Create an analysis error.
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis {
            message: message.into(),
        }
    }

    /// Create a collection error.
    pub fn collection(message: impl Into<String>) -> Self {
        Self::Collection {
            message: message.into(),
        }
    }

    /// Create a SQL generation error.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ReforgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("serialization failed: {}", err),
        }
    }
}

/// Result type alias for reforge operations.
pub type Result<T> = std::result::Result<T, ReforgeError>;
