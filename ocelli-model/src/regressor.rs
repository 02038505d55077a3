use ndarray::{Array2, ArrayView2, ArrayView3, Axis};

use crate::error::{ModelError, Result};
use crate::model::CnnBiGru;

/// A trained model mapping sequence windows to a fixed-width output.
pub trait SequenceRegressor {
    /// Width of each prediction row.
    fn output_dim(&self) -> usize;

    /// Predicts one row per window of `inputs` (shape `(N, T, F)`).
    fn predict(&self, inputs: ArrayView3<f32>) -> Result<Array2<f32>>;

    /// Mean squared error over every element, as reported by `model.evaluate`
    /// for an MSE-compiled network.
    fn evaluate(&self, inputs: ArrayView3<f32>, labels: ArrayView2<f32>) -> Result<f32> {
        if inputs.len_of(Axis(0)) != labels.nrows() {
            return Err(ModelError::shape_mismatch(
                "label rows",
                inputs.len_of(Axis(0)),
                labels.nrows(),
            ));
        }
        if labels.ncols() != self.output_dim() {
            return Err(ModelError::shape_mismatch(
                "label columns",
                self.output_dim(),
                labels.ncols(),
            ));
        }
        let predictions = self.predict(inputs)?;
        let diff = &predictions - &labels;
        Ok(diff.mapv(|d| d * d).mean().unwrap_or(0.0))
    }
}

impl SequenceRegressor for CnnBiGru {
    fn output_dim(&self) -> usize {
        self.args.n_outputs
    }

    fn predict(&self, inputs: ArrayView3<f32>) -> Result<Array2<f32>> {
        let (n, steps, features) = inputs.dim();
        if features != self.args.n_features {
            return Err(ModelError::shape_mismatch(
                "sensor channels",
                self.args.n_features,
                features,
            ));
        }
        tracing::debug!(windows = n, steps, features, "running CNN-BiGRU inference");

        let mut out = Array2::<f32>::zeros((n, self.args.n_outputs));
        for (window, mut row) in inputs.outer_iter().zip(out.outer_iter_mut()) {
            row.assign(&self.forward(&window)?);
        }
        Ok(out)
    }
}
