//! Error types for driver operations

use enose_core::CoreError;
use enose_models::ModelError;
use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors that can occur while driving a core
#[derive(Debug, Error)]
pub enum DriverError {
    /// Core could not be instantiated
    #[error("Core error: {source}")]
    Core {
        /// Underlying core error
        #[from]
        source: CoreError,
    },

    /// Artifacts could not be loaded
    #[error("Model error: {source}")]
    Model {
        /// Underlying artifact error
        #[from]
        source: ModelError,
    },

    /// A handshake or DONE poll did not complete in time
    #[error("Operation timeout after {cycles} cycles")]
    Timeout {
        /// Cycles spent waiting
        cycles: u64,
    },

    /// STATUS.error was set when the window finished
    #[error("Device reported error, STATUS={status:#x}")]
    DeviceError {
        /// STATUS value read back
        status: u32,
    },

    /// Request rejected before touching the device
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Reason for rejection
        reason: String,
    },
}

impl DriverError {
    /// Create an invalid input error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}
