//! `ocelli-eval`: score the fine-tuned model on the real test sets.
//!
//! ```text
//! USAGE:
//!   ocelli-eval [--dataset PATH]... [--model PATH] [--plot-dir DIR | --no-plots] [--no-wait]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ocelli_eval::config::{DEFAULT_DATASETS, DEFAULT_MODEL};
use ocelli_eval::plots::PlotStyle;
use ocelli_eval::{EvalConfig, PlotOutput};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ocelli-eval", about = "Evaluate the fine-tuned angular velocity model", version)]
struct Args {
    /// Test set archive (.npz); repeat for several. Defaults to data10 and data14.
    #[arg(long = "dataset")]
    datasets: Vec<PathBuf>,

    /// Trained model artifact
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: PathBuf,

    /// Memory-map the model artifact
    #[arg(long)]
    mmap: bool,

    /// Sample rate of the recordings, used for the time axis
    #[arg(long, default_value_t = 30.0)]
    frame_rate: f64,

    /// Residual histogram bins
    #[arg(long, default_value_t = 25)]
    bins: usize,

    /// Keep the figures as SVG files in this directory
    #[arg(long, conflicts_with = "no_plots")]
    plot_dir: Option<PathBuf>,

    /// Skip rendering figures
    #[arg(long)]
    no_plots: bool,

    /// Do not pause after each figure
    #[arg(long)]
    no_wait: bool,
}

impl Args {
    fn into_config(self) -> EvalConfig {
        let datasets = if self.datasets.is_empty() {
            DEFAULT_DATASETS.iter().map(PathBuf::from).collect()
        } else {
            self.datasets
        };
        let plots = match (self.no_plots, self.plot_dir) {
            (true, _) => PlotOutput::Off,
            (false, Some(dir)) => PlotOutput::Directory(dir),
            (false, None) => PlotOutput::Viewer { wait: !self.no_wait },
        };
        EvalConfig {
            datasets,
            model_path: self.model,
            mmap: self.mmap,
            style: PlotStyle {
                frame_rate: self.frame_rate,
                bins: self.bins,
            },
            plots,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.frame_rate > 0.0, "--frame-rate must be positive");
    anyhow::ensure!(args.bins > 0, "--bins must be at least 1");
    let config = args.into_config();

    ocelli_eval::run(&config).context("evaluation failed")?;
    Ok(())
}
