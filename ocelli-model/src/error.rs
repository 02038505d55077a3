//! Error types for model inference

use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while assembling or running a model
#[derive(Debug, Error)]
pub enum ModelError {
    /// An input array does not have the size the model expects
    #[error("Shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Which dimension was checked
        what: String,
        /// Size the model expects
        expected: usize,
        /// Size that was supplied
        found: usize,
    },

    /// A window is shorter than the convolution kernel
    #[error("Sequence of {len} steps is shorter than the kernel ({min} steps)")]
    SequenceTooShort {
        /// Steps in the window
        len: usize,
        /// Minimum steps required
        min: usize,
    },

    /// Layer weights or hyperparameters do not fit together
    #[error("Invalid model parameters: {reason}")]
    InvalidParameters {
        /// Reason for failure
        reason: String,
    },
}

impl ModelError {
    /// Create a shape mismatch error
    pub fn shape_mismatch(what: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected,
            found,
        }
    }

    /// Create an invalid parameters error
    pub fn invalid_parameters(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }
}
