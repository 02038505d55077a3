//! Evaluation of the fine-tuned angular-velocity model on real test sets.
//!
//! Loads the trained network and each `.npz` test set, scores the
//! predictions per axis and renders the diagnostic figures.

use ndarray::Array2;
use ocelli_model::SequenceRegressor;

pub mod artifact;
pub mod config;
pub mod dataset;
pub mod display;
pub mod error;
pub mod metrics;
pub mod plots;
pub mod report;

pub use config::{EvalConfig, PlotOutput};
pub use dataset::TestSet;
pub use error::{EvalError, Result};
pub use metrics::{ErrorStats, Histogram};

use display::{Directory, PlotSink, Viewer};
use report::Summary;

/// Scores of one test set.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub set_name: String,
    /// Overall MSE as reported by the model's own `evaluate`.
    pub model_mse: f32,
    pub stats: ErrorStats,
    pub predictions: Array2<f32>,
    pub truth: Array2<f32>,
}

impl Evaluation {
    pub fn summary(&self) -> Summary<'_> {
        Summary {
            set_name: &self.set_name,
            model_mse: self.model_mse,
            stats: &self.stats,
        }
    }

    /// `truth - predictions`, one column per axis.
    pub fn residuals(&self) -> Result<Array2<f64>> {
        metrics::residuals(self.truth.view(), self.predictions.view())
    }
}

/// Runs the model over one test set and scores it.
pub fn evaluate_set<M: SequenceRegressor + ?Sized>(model: &M, set: &TestSet) -> Result<Evaluation> {
    let model_mse = model.evaluate(set.inputs_seq.view(), set.labels.view())?;
    let predictions = model.predict(set.inputs_seq.view())?;
    let stats = ErrorStats::compute(predictions.view(), set.labels.view())?;
    tracing::info!(set = %set.name, loss = stats.loss, "test set scored");
    Ok(Evaluation {
        set_name: set.name.clone(),
        model_mse,
        stats,
        predictions,
        truth: set.labels.clone(),
    })
}

fn open_sink(output: &PlotOutput) -> Result<Option<Box<dyn PlotSink>>> {
    let sink: Box<dyn PlotSink> = match output {
        PlotOutput::Off => return Ok(None),
        PlotOutput::Viewer { wait } => Box::new(Viewer::new(*wait)?),
        PlotOutput::Directory(dir) => Box::new(Directory::new(dir)?),
    };
    Ok(Some(sink))
}

/// Loads the model once, then evaluates, reports and plots every test set in order.
pub fn run(config: &EvalConfig) -> Result<Vec<Evaluation>> {
    let model = if config.mmap {
        artifact::load_model_mmap(&config.model_path)?
    } else {
        artifact::load_model(&config.model_path)?
    };
    tracing::info!(
        features = model.args.n_features,
        hidden = model.args.hidden_dim,
        "Loaded model {}",
        config.model_path.display()
    );

    let mut sink = open_sink(&config.plots)?;
    let mut results = Vec::with_capacity(config.datasets.len());
    for path in &config.datasets {
        let set = TestSet::load(path)?;
        println!("{}", set.shapes_summary());

        let eval = evaluate_set(&model, &set)?;
        println!("{}\n", eval.summary());

        if let Some(sink) = sink.as_mut() {
            for figure in plots::render_figures(&eval, &config.style)? {
                sink.show(&eval.set_name, &figure)?;
            }
        }
        results.push(eval);
    }
    Ok(results)
}
