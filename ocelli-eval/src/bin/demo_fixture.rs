//! Writes a randomly initialised model artifact and two synthetic test sets.
//!
//! The output directory can be fed straight to `ocelli-eval` to exercise the
//! whole pipeline without real recordings.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ndarray::{s, Array2, Array3, Axis};
use ocelli_eval::{artifact, TestSet};
use ocelli_model::{CnnBiGru, ModelArgs};
use rand::Rng;

#[derive(Parser)]
struct Args {
    /// Directory to write into
    #[arg(long, default_value = "fixture")]
    out_dir: PathBuf,

    /// Windows per test set
    #[arg(long, default_value_t = 300)]
    samples: usize,

    /// Time steps per window
    #[arg(long, default_value_t = 10)]
    seq_len: usize,
}

/// Smooth sensor-like signals with a little noise; labels follow channel differences.
fn synthetic_set(name: &str, samples: usize, seq_len: usize, features: usize, phase: f32) -> Result<TestSet> {
    let mut rng = rand::thread_rng();
    let inputs_seq = Array3::<f32>::from_shape_fn((samples, seq_len, features), |(i, t, f)| {
        let step = (i + t) as f32 / 30.0;
        (step * (1.0 + f as f32 * 0.3) + phase).sin() + rng.gen_range(-0.05..0.05)
    });
    let last = inputs_seq.slice(s![.., seq_len - 1, ..]);
    let labels = Array2::<f32>::from_shape_fn((samples, 3), |(i, a)| {
        last[[i, 2 * a % features]] - last[[i, (2 * a + 1) % features]]
    });
    let simple_inputs = last.to_owned().into_dyn();
    TestSet::from_arrays(name, simple_inputs, inputs_seq, labels)
        .with_context(|| format!("building synthetic set {name}"))
}

fn main() -> Result<()> {
    let args = Args::parse();
    anyhow::ensure!(args.seq_len >= ModelArgs::default().kernel_size, "--seq-len is shorter than the kernel");
    std::fs::create_dir_all(&args.out_dir)?;

    let model = CnnBiGru::new(ModelArgs::new());
    let model_path = args.out_dir.join("real_model.ocmv");
    artifact::save_model(&model, &model_path)?;
    println!("Saved model to {:?}", model_path);

    for (name, phase) in [("data10", 0.0), ("data14", 1.3)] {
        let set = synthetic_set(name, args.samples, args.seq_len, model.args.n_features, phase)?;
        let path = args.out_dir.join(format!("{name}.npz"));
        set.save(&path)?;
        println!(
            "Saved {} windows of {} steps to {:?}",
            set.inputs_seq.len_of(Axis(0)),
            args.seq_len,
            path
        );
    }
    Ok(())
}
