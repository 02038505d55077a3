use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use ndarray::{Array2, Array3};
use ocelli_eval::artifact::save_model;
use ocelli_eval::plots::{render_figures, PlotStyle};
use ocelli_eval::{evaluate_set, run, EvalConfig, EvalError, PlotOutput, TestSet};
use ocelli_model::{CnnBiGru, ModelArgs, SequenceRegressor};

fn args() -> ModelArgs {
    ModelArgs {
        n_features: 4,
        conv_channels: 6,
        kernel_size: 3,
        hidden_dim: 8,
        n_outputs: 3,
    }
}

fn synthetic_set(name: &str, n: usize) -> TestSet {
    let seq = Array3::<f32>::from_shape_fn((n, 7, 4), |(i, t, f)| ((i + t) as f32 * 0.2 + f as f32).sin());
    let labels = Array2::<f32>::from_shape_fn((n, 3), |(i, a)| ((i * 3 + a) as f32 * 0.1).cos());
    let simple = Array2::<f32>::zeros((n, 4)).into_dyn();
    TestSet::from_arrays(name, simple, seq, labels).unwrap()
}

fn write_fixture(dir: &Path) -> (PathBuf, Vec<PathBuf>) {
    let model_path = dir.join("real_model.ocmv");
    save_model(&CnnBiGru::new(args()), &model_path).unwrap();
    let sets = ["data10", "data14"]
        .iter()
        .map(|name| {
            let path = dir.join(format!("{name}.npz"));
            synthetic_set(name, 12).save(&path).unwrap();
            path
        })
        .collect();
    (model_path, sets)
}

#[test]
fn test_evaluate_set_uses_the_loaded_model() {
    let model = CnnBiGru::new(args());
    let set = synthetic_set("data10", 9);
    let eval = evaluate_set(&model, &set).unwrap();

    assert_eq!(eval.predictions, model.predict(set.inputs_seq.view()).unwrap());
    assert_eq!(eval.predictions.dim(), (9, 3));
    assert_abs_diff_eq!(f64::from(eval.model_mse), eval.stats.loss, epsilon = 1e-5);
}

#[test]
fn test_summary_lines() {
    let model = CnnBiGru::new(args());
    let eval = evaluate_set(&model, &synthetic_set("data14", 5)).unwrap();
    let text = eval.summary().to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("Testing data14 real set MSE = "));
    assert!(lines[1].starts_with("Testing real set. Error in x-axis = "));
    assert!(lines[3].starts_with("Testing real set. Error in z-axis = "));
    assert!(lines[4].contains(&format!("{:.4} +/- {:.4}", eval.stats.loss, eval.stats.sem_loss)));
}

#[test]
fn test_figures_render_to_svg() {
    let model = CnnBiGru::new(args());
    let eval = evaluate_set(&model, &synthetic_set("data10", 30)).unwrap();
    let figures = render_figures(&eval, &PlotStyle::default()).unwrap();
    let names: Vec<&str> = figures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        ["omega_x", "omega_y", "omega_z", "stacked", "residual_histogram"]
    );
    for figure in &figures {
        assert!(figure.svg.contains("<svg"), "{} is not svg", figure.name);
        assert!(figure.svg.len() > 1000);
    }
    assert!(figures[0].svg.contains("Ground-truth"));
    assert!(figures[4].svg.contains("Frequency (%)"));
}

#[test]
fn test_run_scores_every_set_and_keeps_figures() {
    let dir = tempfile::tempdir().unwrap();
    let (model_path, datasets) = write_fixture(dir.path());
    let plot_dir = dir.path().join("plots");
    let config = EvalConfig {
        datasets,
        model_path,
        plots: PlotOutput::Directory(plot_dir.clone()),
        ..EvalConfig::default()
    };

    let results = run(&config).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].set_name, "data10");
    assert_eq!(results[1].set_name, "data14");
    assert!(plot_dir.join("data10_omega_x.svg").is_file());
    assert!(plot_dir.join("data14_residual_histogram.svg").is_file());
}

#[test]
fn test_run_with_mmap_and_no_plots() {
    let dir = tempfile::tempdir().unwrap();
    let (model_path, datasets) = write_fixture(dir.path());
    let config = EvalConfig {
        datasets,
        model_path,
        mmap: true,
        plots: PlotOutput::Off,
        ..EvalConfig::default()
    };
    let results = run(&config).unwrap();
    assert!(results.iter().all(|r| r.stats.loss.is_finite()));
}

#[test]
fn test_run_fails_on_missing_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let (model_path, mut datasets) = write_fixture(dir.path());
    datasets.push(dir.path().join("data99.npz"));
    let config = EvalConfig {
        datasets,
        model_path,
        plots: PlotOutput::Off,
        ..EvalConfig::default()
    };
    assert!(matches!(run(&config), Err(EvalError::DatasetNotFound { .. })));
}

#[test]
fn test_run_fails_on_feature_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let (_, datasets) = write_fixture(dir.path());
    let model_path = dir.path().join("wide.ocmv");
    let wide = ModelArgs {
        n_features: 5,
        ..args()
    };
    save_model(&CnnBiGru::new(wide), &model_path).unwrap();
    let config = EvalConfig {
        datasets,
        model_path,
        plots: PlotOutput::Off,
        ..EvalConfig::default()
    };
    assert!(matches!(run(&config), Err(EvalError::Model(_))));
}
