use approx::assert_abs_diff_eq;
use ndarray::{arr2, Array2, Axis};
use ocelli_eval::metrics::{residuals, squared_errors};
use ocelli_eval::{ErrorStats, EvalError, Histogram};

fn truth() -> Array2<f32> {
    arr2(&[
        [0.10, -0.20, 0.30],
        [0.50, 0.00, -0.10],
        [-0.40, 0.25, 0.05],
        [0.00, 0.10, 0.20],
    ])
}

fn predictions() -> Array2<f32> {
    arr2(&[
        [0.00, -0.10, 0.30],
        [0.70, 0.10, 0.10],
        [-0.10, 0.20, 0.00],
        [0.10, -0.20, 0.40],
    ])
}

#[test]
fn test_mse_per_axis_matches_column_mean() {
    let stats = ErrorStats::compute(predictions().view(), truth().view()).unwrap();
    let gt = truth();
    let pred = predictions();
    for axis in 0..3 {
        let expected: f64 = gt
            .column(axis)
            .iter()
            .zip(pred.column(axis))
            .map(|(&g, &p)| {
                let d = f64::from(g) - f64::from(p);
                d * d
            })
            .sum::<f64>()
            / 4.0;
        assert_abs_diff_eq!(stats.mse[axis], expected, epsilon = 1e-9);
    }
}

#[test]
fn test_sem_uses_population_std() {
    let stats = ErrorStats::compute(predictions().view(), truth().view()).unwrap();
    let err = squared_errors(predictions().view(), truth().view()).unwrap();
    for (axis, column) in err.axis_iter(Axis(1)).enumerate() {
        let mean = column.sum() / 4.0;
        let var = column.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / 4.0;
        assert_abs_diff_eq!(stats.sem[axis], var.sqrt() / 2.0, epsilon = 1e-9);
    }
}

#[test]
fn test_loss_is_mean_of_axis_errors() {
    let stats = ErrorStats::compute(predictions().view(), truth().view()).unwrap();
    assert_abs_diff_eq!(stats.loss, stats.mse.sum() / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(stats.sem_loss, stats.sem.sum() / 3.0, epsilon = 1e-12);
}

#[test]
fn test_constant_error_has_zero_sem() {
    let gt = Array2::<f32>::zeros((5, 3));
    let pred = Array2::<f32>::from_elem((5, 3), 0.5);
    let stats = ErrorStats::compute(pred.view(), gt.view()).unwrap();
    for axis in 0..3 {
        assert_abs_diff_eq!(stats.mse[axis], 0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.sem[axis], 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_row_count_mismatch_fails() {
    let pred = Array2::<f32>::zeros((3, 3));
    match ErrorStats::compute(pred.view(), truth().view()) {
        Err(EvalError::RowMismatch { left: 3, right: 4, .. }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_column_mismatch_fails() {
    let pred = Array2::<f32>::zeros((4, 2));
    assert!(matches!(
        ErrorStats::compute(pred.view(), truth().view()),
        Err(EvalError::InvalidShape { .. })
    ));
}

#[test]
fn test_empty_input_fails() {
    let empty = Array2::<f32>::zeros((0, 3));
    assert!(matches!(
        ErrorStats::compute(empty.view(), empty.view()),
        Err(EvalError::EmptyDataset { .. })
    ));
}

#[test]
fn test_residuals_are_truth_minus_prediction() {
    let r = residuals(truth().view(), predictions().view()).unwrap();
    assert_abs_diff_eq!(r[[1, 0]], -0.2, epsilon = 1e-6);
    assert_abs_diff_eq!(r[[3, 1]], 0.3, epsilon = 1e-6);
}

#[test]
fn test_histogram_columns_sum_to_one_hundred_percent() {
    let r = residuals(truth().view(), predictions().view()).unwrap();
    let hist = Histogram::weighted(r.view(), 25);
    assert_eq!(hist.bins(), 25);
    assert_eq!(hist.edges.len(), 26);
    for column in hist.percent.axis_iter(Axis(1)) {
        assert_abs_diff_eq!(column.sum(), 100.0, epsilon = 1e-9);
    }
    let lo = r.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = r.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert_abs_diff_eq!(hist.edges[0], lo, epsilon = 1e-12);
    assert_abs_diff_eq!(hist.edges[25], hi, epsilon = 1e-9);
}
