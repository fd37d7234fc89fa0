//! Error types for convolution core operations

use thiserror::Error;

/// Result type alias for convolution core operations
pub type Result<T> = std::result::Result<T, ConvError>;

/// Errors that can occur while configuring or driving the core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvError {
    /// Configuration rejected when cloned into a run
    #[error("Invalid configuration: {reason}")]
    Configuration {
        /// Reason for rejection
        reason: String,
    },

    /// Value does not fit the register field
    #[error("Value {value} does not fit field {field} (max {max})")]
    FieldOutOfRange {
        /// Field name
        field: &'static str,
        /// Rejected value
        value: u32,
        /// Largest representable value
        max: u32,
    },

    /// Engine index out of range
    #[error("Engine index {index} out of range (have {count} slots)")]
    InvalidEngine {
        /// Requested index
        index: usize,
        /// Number of engine slots
        count: usize,
    },

    /// Kernel blob has the wrong number of coefficients
    #[error("Kernel needs 9 coefficients, got {len}")]
    InvalidKernel {
        /// Coefficients supplied
        len: usize,
    },

    /// Activation matrix is malformed or does not match the run
    #[error("Invalid activation matrix: {reason}")]
    InvalidMatrix {
        /// Reason for rejection
        reason: String,
    },

    /// Streaming handshake or control-plane protocol violated
    #[error("Protocol violation: {reason}")]
    Protocol {
        /// What was violated
        reason: String,
    },

    /// Driver tick budget exhausted before the run finished
    #[error("Run did not finish within {ticks} ticks")]
    Timeout {
        /// Budget that was exhausted
        ticks: u64,
    },
}

impl ConvError {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Create an invalid matrix error
    pub fn invalid_matrix(reason: impl Into<String>) -> Self {
        Self::InvalidMatrix {
            reason: reason.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }
}
