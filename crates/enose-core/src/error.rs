//! Error types for core construction

use crate::weights::Matrix;
use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while instantiating a core.
///
/// A running core never fails: bus transactions and stream beats have no
/// error response, so these only come out of parameter and weight checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Core parameters are inconsistent
    #[error("Invalid core configuration: {reason}")]
    InvalidConfig {
        /// Reason for rejection
        reason: String,
    },

    /// Weight matrix does not match the core geometry
    #[error("{matrix} has {got} entries, expected {expected}")]
    WeightShape {
        /// Offending matrix
        matrix: Matrix,
        /// Entries required by the geometry
        expected: usize,
        /// Entries supplied
        got: usize,
    },
}

impl CoreError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
