use std::fs::File;
use std::path::Path;

use ndarray::{Array1, Array2, Array3, ArrayD};
use ndarray_npy::NpzWriter;
use ocelli_eval::dataset::{fmt_shape, TestSet};
use ocelli_eval::EvalError;

fn arrays(n: usize) -> (ArrayD<f32>, Array3<f32>, Array2<f32>) {
    let simple = Array2::<f32>::from_shape_fn((n, 4), |(i, f)| (i + f) as f32).into_dyn();
    let seq = Array3::<f32>::from_shape_fn((n, 5, 4), |(i, t, f)| (i * 20 + t * 4 + f) as f32 * 0.01);
    let labels = Array2::<f32>::from_shape_fn((n, 3), |(i, a)| i as f32 - a as f32);
    (simple, seq, labels)
}

fn write_raw(path: &Path, entries: &[(&str, ArrayD<f64>)]) {
    let mut npz = NpzWriter::new(File::create(path).unwrap());
    for (name, arr) in entries {
        npz.add_array(*name, arr).unwrap();
    }
    npz.finish().unwrap();
}

#[test]
fn test_save_then_load_keeps_arrays_and_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data10.npz");
    let (simple, seq, labels) = arrays(6);
    TestSet::from_arrays("data10", simple.clone(), seq.clone(), labels.clone())
        .unwrap()
        .save(&path)
        .unwrap();

    let set = TestSet::load(&path).unwrap();
    assert_eq!(set.name, "data10");
    assert_eq!(set.len(), 6);
    assert_eq!(set.simple_inputs, simple);
    assert_eq!(set.inputs_seq, seq);
    assert_eq!(set.labels, labels);
}

#[test]
fn test_f64_archive_without_suffix_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data14.npz");
    let (simple, seq, labels) = arrays(3);
    write_raw(
        &path,
        &[
            ("simple_inputs", simple.mapv(f64::from)),
            ("inputs_seq", seq.mapv(f64::from).into_dyn()),
            ("labels", labels.mapv(f64::from).into_dyn()),
        ],
    );
    let set = TestSet::load(&path).unwrap();
    assert_eq!(set.labels, labels);
    assert_eq!(set.inputs_seq.dim(), (3, 5, 4));
}

#[test]
fn test_missing_key_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.npz");
    let (simple, seq, _) = arrays(3);
    write_raw(
        &path,
        &[
            ("simple_inputs.npy", simple.mapv(f64::from)),
            ("inputs_seq.npy", seq.mapv(f64::from).into_dyn()),
        ],
    );
    match TestSet::load(&path) {
        Err(EvalError::MissingKey { key, .. }) => assert_eq!(key, "labels"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        TestSet::load(dir.path().join("data10.npz")),
        Err(EvalError::DatasetNotFound { .. })
    ));
}

#[test]
fn test_malformed_archive_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.npz");
    std::fs::write(&path, b"not a zip archive").unwrap();
    assert!(matches!(TestSet::load(&path), Err(EvalError::Npz(_))));
}

#[test]
fn test_sequence_rank_is_checked() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flat.npz");
    let (simple, _, labels) = arrays(3);
    write_raw(
        &path,
        &[
            ("simple_inputs.npy", simple.mapv(f64::from)),
            ("inputs_seq.npy", Array2::<f64>::zeros((3, 20)).into_dyn()),
            ("labels.npy", labels.mapv(f64::from).into_dyn()),
        ],
    );
    match TestSet::load(&path) {
        Err(EvalError::InvalidShape { name, found, .. }) => {
            assert_eq!(name, "inputs_seq");
            assert_eq!(found, vec![3, 20]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_label_width_is_checked() {
    let (simple, seq, _) = arrays(3);
    let labels = Array2::<f32>::zeros((3, 2));
    assert!(matches!(
        TestSet::from_arrays("bad", simple, seq, labels),
        Err(EvalError::InvalidShape { .. })
    ));
}

#[test]
fn test_row_counts_must_agree() {
    let (simple, seq, _) = arrays(4);
    let labels = Array2::<f32>::zeros((3, 3));
    match TestSet::from_arrays("bad", simple, seq, labels) {
        Err(EvalError::RowMismatch { left: 4, right: 3, .. }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_empty_set_is_rejected() {
    let (simple, seq, labels) = arrays(0);
    assert!(matches!(
        TestSet::from_arrays("empty", simple, seq, labels),
        Err(EvalError::EmptyDataset { .. })
    ));
}

#[test]
fn test_shapes_print_like_numpy() {
    assert_eq!(fmt_shape(&[120]), "(120,)");
    assert_eq!(fmt_shape(&[120, 10, 6]), "(120, 10, 6)");

    let simple = Array1::<f32>::zeros(2).into_dyn();
    let (_, seq, labels) = arrays(2);
    let set = TestSet::from_arrays("tiny", simple, seq, labels).unwrap();
    let summary = set.shapes_summary();
    assert!(summary.contains("simple input data loaded with shape: (2,)"));
    assert!(summary.contains("sequenced input data loaded with shape: (2, 5, 4)"));
    assert!(summary.contains("label data loaded with shape: (2, 3)"));
}
