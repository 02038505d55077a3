//! Evaluation run configuration.

use std::path::PathBuf;

use crate::plots::PlotStyle;

pub const DEFAULT_DATASETS: [&str; 2] = [
    "../data/processed_data/real_data/data10.npz",
    "../data/processed_data/real_data/data14.npz",
];
pub const DEFAULT_MODEL: &str = "../models/real_model.ocmv";

/// How figures are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlotOutput {
    /// Render nothing.
    Off,
    /// Temporary files, removed on exit; optionally pause after each.
    Viewer { wait: bool },
    /// Persist SVGs in this directory.
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub datasets: Vec<PathBuf>,
    pub model_path: PathBuf,
    /// Memory-map the artifact instead of reading it.
    pub mmap: bool,
    pub style: PlotStyle,
    pub plots: PlotOutput,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            datasets: DEFAULT_DATASETS.iter().map(PathBuf::from).collect(),
            model_path: PathBuf::from(DEFAULT_MODEL),
            mmap: false,
            style: PlotStyle::default(),
            plots: PlotOutput::Viewer { wait: true },
        }
    }
}
