//! Inference-only sequence regression model.
//!
//! Holds the CNN-BiGRU network that maps windows of ocelli sensor samples
//! to three-axis angular velocity, and the [`SequenceRegressor`] trait the
//! evaluation tooling is written against.

pub mod error;
pub mod model;
pub mod regressor;

pub use error::{ModelError, Result};
pub use model::{BiGru, CnnBiGru, Conv1d, GruCell, Linear, ModelArgs};
pub use regressor::SequenceRegressor;
