//! Error types for artifact loading

use enose_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for artifact operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur while reading weight artifacts and vectors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Artifact file missing
    #[error("Artifact not found: {path}")]
    FileNotFound {
        /// Path that was attempted
        path: PathBuf,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Malformed JSON parameters
    #[error("Invalid parameter JSON: {source}")]
    Json {
        /// Underlying serde error
        #[from]
        source: serde_json::Error,
    },

    /// Malformed text artifact
    #[error("Failed to parse artifact: {reason}")]
    Parse {
        /// Reason for failure, with location
        reason: String,
    },

    /// Artifact contents disagree with the declared geometry
    #[error("Shape mismatch: {reason}")]
    Shape {
        /// Reason for failure
        reason: String,
    },

    /// The artifacts describe a core that cannot be built
    #[error("Invalid core from artifacts: {source}")]
    Core {
        /// Core validation error
        #[from]
        source: CoreError,
    },
}

impl ModelError {
    /// Create a parse error
    pub fn parse_error(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    /// Create a parse error pointing at a line (1-based)
    pub fn parse_at(line: usize, reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            reason: format!("line {line}: {reason}"),
        }
    }

    /// Create a shape error
    pub fn shape(reason: impl Into<String>) -> Self {
        Self::Shape {
            reason: reason.into(),
        }
    }
}
