//! Error statistics between predictions and ground truth.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::{EvalError, Result};

fn check_aligned(predictions: &ArrayView2<f32>, truth: &ArrayView2<f32>) -> Result<()> {
    if predictions.nrows() != truth.nrows() {
        return Err(EvalError::row_mismatch(
            "predictions",
            predictions.nrows(),
            "labels",
            truth.nrows(),
        ));
    }
    if predictions.ncols() != truth.ncols() {
        return Err(EvalError::invalid_shape(
            "predictions",
            format!("(N, {})", truth.ncols()),
            predictions.shape(),
        ));
    }
    Ok(())
}

/// `(pred - truth)^2` elementwise, widened to f64.
pub fn squared_errors(predictions: ArrayView2<f32>, truth: ArrayView2<f32>) -> Result<Array2<f64>> {
    check_aligned(&predictions, &truth)?;
    let diff = (&predictions - &truth).mapv(f64::from);
    Ok(diff.mapv(|d| d * d))
}

/// Signed `truth - pred`, widened to f64.
pub fn residuals(truth: ArrayView2<f32>, predictions: ArrayView2<f32>) -> Result<Array2<f64>> {
    check_aligned(&predictions, &truth)?;
    Ok((&truth - &predictions).mapv(f64::from))
}

/// Per-axis mean squared error and its standard error.
#[derive(Debug, Clone)]
pub struct ErrorStats {
    /// `mean(err, axis=0)`
    pub mse: Array1<f64>,
    /// `std(err, axis=0) / sqrt(N)`, population std
    pub sem: Array1<f64>,
    /// `mean(mse)`
    pub loss: f64,
    /// `mean(sem)`
    pub sem_loss: f64,
}

impl ErrorStats {
    pub fn compute(predictions: ArrayView2<f32>, truth: ArrayView2<f32>) -> Result<Self> {
        let err = squared_errors(predictions, truth)?;
        Self::from_squared_errors(&err)
    }

    pub fn from_squared_errors(err: &Array2<f64>) -> Result<Self> {
        let n = err.nrows();
        if n == 0 || err.ncols() == 0 {
            return Err(EvalError::EmptyDataset {
                name: "squared errors".to_string(),
            });
        }
        let mse = err
            .mean_axis(Axis(0))
            .ok_or_else(|| EvalError::invalid_shape("squared errors", "(N, axes)", err.shape()))?;
        let sem = err.std_axis(Axis(0), 0.0) / (n as f64).sqrt();
        let loss = mse.mean().unwrap_or(f64::NAN);
        let sem_loss = sem.mean().unwrap_or(f64::NAN);
        Ok(Self {
            mse,
            sem,
            loss,
            sem_loss,
        })
    }

    pub fn axes(&self) -> usize {
        self.mse.len()
    }
}

/// Weighted histogram with bin edges shared across all columns.
///
/// Each sample weighs `100 / N`, so every column's bins sum to 100 %.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// `bins + 1` ascending edges.
    pub edges: Array1<f64>,
    /// `bins x columns` percentages.
    pub percent: Array2<f64>,
}

impl Histogram {
    pub fn weighted(values: ArrayView2<f64>, bins: usize) -> Self {
        let bins = bins.max(1);
        let finite = || values.iter().copied().filter(|v| v.is_finite());
        let mut lo = finite().fold(f64::INFINITY, f64::min);
        let mut hi = finite().fold(f64::NEG_INFINITY, f64::max);
        if !lo.is_finite() || !hi.is_finite() {
            lo = 0.0;
            hi = 0.0;
        }
        if hi <= lo {
            lo -= 0.5;
            hi += 0.5;
        }
        let width = (hi - lo) / bins as f64;
        let edges = Array1::from_shape_fn(bins + 1, |i| lo + width * i as f64);

        let mut percent = Array2::<f64>::zeros((bins, values.ncols()));
        let n = values.nrows();
        if n == 0 {
            return Self { edges, percent };
        }
        let weight = 100.0 / n as f64;
        for (col, column) in values.axis_iter(Axis(1)).enumerate() {
            for &v in column.iter().filter(|v| v.is_finite()) {
                // last bin is closed on the right
                let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
                percent[[idx, col]] += weight;
            }
        }
        Self { edges, percent }
    }

    pub fn bins(&self) -> usize {
        self.percent.nrows()
    }

    pub fn bin_width(&self) -> f64 {
        self.edges[1] - self.edges[0]
    }

    pub fn max_percent(&self) -> f64 {
        self.percent.iter().copied().fold(0.0, f64::max)
    }
}
