//! Error types for the evaluation pipeline

use std::path::PathBuf;

use ndarray_npy::{ReadNpzError, WriteNpzError};
use ocelli_model::ModelError;
use thiserror::Error;

/// Result type alias for evaluation operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while loading inputs, scoring or plotting
#[derive(Debug, Error)]
pub enum EvalError {
    /// Test archive does not exist
    #[error("Dataset file not found: {path}")]
    DatasetNotFound {
        /// Path that was attempted
        path: PathBuf,
    },

    /// Archive lacks one of the expected arrays
    #[error("Dataset {path} has no array named '{key}'")]
    MissingKey {
        /// Archive path
        path: PathBuf,
        /// Array name that was looked up
        key: String,
    },

    /// An array has the wrong rank or width
    #[error("Array '{name}' has shape {found:?}, expected {expected}")]
    InvalidShape {
        /// Array name
        name: String,
        /// Human readable expected shape
        expected: String,
        /// Actual shape
        found: Vec<usize>,
    },

    /// Two arrays that must be row-aligned are not
    #[error("Row count mismatch: {left_name} has {left} rows, {right_name} has {right}")]
    RowMismatch {
        /// First array name
        left_name: String,
        /// First array rows
        left: usize,
        /// Second array name
        right_name: String,
        /// Second array rows
        right: usize,
    },

    /// No samples to score
    #[error("Dataset '{name}' contains no samples")]
    EmptyDataset {
        /// Dataset name
        name: String,
    },

    /// Model artifact does not exist
    #[error("Model file not found: {path}")]
    ModelNotFound {
        /// Path that was attempted
        path: PathBuf,
    },

    /// Model artifact is malformed
    #[error("Invalid model artifact: {reason}")]
    InvalidArtifact {
        /// Reason for failure
        reason: String,
    },

    /// Model artifact written by an unknown format revision
    #[error("Unsupported model artifact version: {version} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the header
        version: u32,
        /// Version this build reads
        expected: u32,
    },

    /// Inference failed
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Reading an npz archive failed
    #[error("Failed to read npz archive: {0}")]
    Npz(#[from] ReadNpzError),

    /// Writing an npz archive failed
    #[error("Failed to write npz archive: {0}")]
    NpzWrite(#[from] WriteNpzError),

    /// Rendering a figure failed
    #[error("Failed to render figure '{figure}': {reason}")]
    Plot {
        /// Figure name
        figure: String,
        /// Reason for failure
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl EvalError {
    /// Create an invalid artifact error
    pub fn invalid_artifact(reason: impl Into<String>) -> Self {
        Self::InvalidArtifact {
            reason: reason.into(),
        }
    }

    /// Create an invalid shape error
    pub fn invalid_shape(name: impl Into<String>, expected: impl Into<String>, found: &[usize]) -> Self {
        Self::InvalidShape {
            name: name.into(),
            expected: expected.into(),
            found: found.to_vec(),
        }
    }

    /// Create a row mismatch error
    pub fn row_mismatch(
        left_name: impl Into<String>,
        left: usize,
        right_name: impl Into<String>,
        right: usize,
    ) -> Self {
        Self::RowMismatch {
            left_name: left_name.into(),
            left,
            right_name: right_name.into(),
            right,
        }
    }

    /// Create a plot error
    pub fn plot(figure: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Plot {
            figure: figure.into(),
            reason: reason.to_string(),
        }
    }
}
