//! Pre-processed real-data test sets stored as `.npz` archives.
//!
//! Each archive holds three arrays sharing their first axis:
//!
//! - `simple_inputs`: per-sample features, reported but not scored
//! - `inputs_seq`: `(N, T, F)` sensor windows fed to the recurrent model
//! - `labels`: `(N, 3)` ground-truth angular velocity in rad/s
//!
//! Arrays may be stored as `f32` or `f64`; they are held as `f32`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::Path;

use ndarray::{Array2, Array3, ArrayD, Axis, Ix2, Ix3};
use ndarray_npy::{NpzReader, NpzWriter, ReadNpyError, ReadNpzError};

use crate::error::{EvalError, Result};

pub const SIMPLE_INPUTS_KEY: &str = "simple_inputs";
pub const INPUTS_SEQ_KEY: &str = "inputs_seq";
pub const LABELS_KEY: &str = "labels";

/// Number of angular velocity axes in the labels.
pub const AXES: usize = 3;

/// One loaded test set.
#[derive(Debug, Clone)]
pub struct TestSet {
    pub name: String,
    pub simple_inputs: ArrayD<f32>,
    pub inputs_seq: Array3<f32>,
    pub labels: Array2<f32>,
}

impl TestSet {
    /// Builds a test set, checking that the arrays line up.
    pub fn from_arrays(
        name: impl Into<String>,
        simple_inputs: ArrayD<f32>,
        inputs_seq: Array3<f32>,
        labels: Array2<f32>,
    ) -> Result<Self> {
        let name = name.into();
        if labels.ncols() != AXES {
            return Err(EvalError::invalid_shape(LABELS_KEY, "(N, 3)", labels.shape()));
        }
        if simple_inputs.ndim() == 0 {
            return Err(EvalError::invalid_shape(
                SIMPLE_INPUTS_KEY,
                "(N, ...)",
                simple_inputs.shape(),
            ));
        }
        let n = labels.nrows();
        let seq_rows = inputs_seq.len_of(Axis(0));
        if seq_rows != n {
            return Err(EvalError::row_mismatch(INPUTS_SEQ_KEY, seq_rows, LABELS_KEY, n));
        }
        let simple_rows = simple_inputs.len_of(Axis(0));
        if simple_rows != n {
            return Err(EvalError::row_mismatch(SIMPLE_INPUTS_KEY, simple_rows, LABELS_KEY, n));
        }
        if n == 0 {
            return Err(EvalError::EmptyDataset { name });
        }
        if labels.iter().any(|v| !v.is_finite()) {
            tracing::warn!(dataset = %name, "labels contain non-finite values");
        }
        Ok(Self {
            name,
            simple_inputs,
            inputs_seq,
            labels,
        })
    }

    /// Loads a test set from an `.npz` archive; the set is named after the file stem.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(EvalError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }
        tracing::info!("Loading test set {}", path.display());

        let mut npz = NpzReader::new(BufReader::new(File::open(path)?))?;
        let names = npz.names()?;
        let mut fetch = |key: &str| -> Result<ArrayD<f32>> {
            let entry = resolve_key(&names, key).ok_or_else(|| EvalError::MissingKey {
                path: path.to_path_buf(),
                key: key.to_string(),
            })?;
            read_as_f32(&mut npz, entry)
        };

        let simple_inputs = fetch(SIMPLE_INPUTS_KEY)?;
        let inputs_seq = fetch(INPUTS_SEQ_KEY)?;
        let labels = fetch(LABELS_KEY)?;

        let seq_shape = inputs_seq.shape().to_vec();
        let inputs_seq = inputs_seq
            .into_dimensionality::<Ix3>()
            .map_err(|_| EvalError::invalid_shape(INPUTS_SEQ_KEY, "(N, T, F)", &seq_shape))?;
        let label_shape = labels.shape().to_vec();
        let labels = labels
            .into_dimensionality::<Ix2>()
            .map_err(|_| EvalError::invalid_shape(LABELS_KEY, "(N, 3)", &label_shape))?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let set = Self::from_arrays(name, simple_inputs, inputs_seq, labels)?;
        tracing::debug!(
            dataset = %set.name,
            samples = set.len(),
            window = set.inputs_seq.len_of(Axis(1)),
            features = set.inputs_seq.len_of(Axis(2)),
            "test set loaded"
        );
        Ok(set)
    }

    /// Writes the set in the layout `load` reads, with numpy's `.npy` entry names.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut npz = NpzWriter::new(BufWriter::new(File::create(path)?));
        npz.add_array(format!("{SIMPLE_INPUTS_KEY}.npy"), &self.simple_inputs)?;
        npz.add_array(format!("{INPUTS_SEQ_KEY}.npy"), &self.inputs_seq)?;
        npz.add_array(format!("{LABELS_KEY}.npy"), &self.labels)?;
        npz.finish()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The three "loaded with shape" lines printed before scoring.
    pub fn shapes_summary(&self) -> String {
        format!(
            "Testing real simple input data loaded with shape: {}\n\
             Testing real sequenced input data loaded with shape: {}\n\
             Testing real ground-truth label data loaded with shape: {}",
            fmt_shape(self.simple_inputs.shape()),
            fmt_shape(self.inputs_seq.shape()),
            fmt_shape(self.labels.shape()),
        )
    }
}

/// Formats a shape the way numpy prints it, e.g. `(120,)` or `(120, 3)`.
pub fn fmt_shape(shape: &[usize]) -> String {
    match shape {
        [n] => format!("({n},)"),
        dims => {
            let parts: Vec<String> = dims.iter().map(ToString::to_string).collect();
            format!("({})", parts.join(", "))
        }
    }
}

fn resolve_key<'a>(names: &'a [String], key: &str) -> Option<&'a str> {
    let suffixed = format!("{key}.npy");
    names
        .iter()
        .find(|n| n.as_str() == key || n.as_str() == suffixed)
        .map(String::as_str)
}

fn read_as_f32<R: Read + Seek>(npz: &mut NpzReader<R>, entry: &str) -> Result<ArrayD<f32>> {
    match npz.by_name::<ndarray::OwnedRepr<f32>, _>(entry) {
        Ok(arr) => Ok(arr),
        Err(ReadNpzError::Npy(ReadNpyError::WrongDescriptor(_))) => {
            let wide: ArrayD<f64> = npz.by_name(entry)?;
            Ok(wide.mapv(|v| v as f32))
        }
        Err(e) => Err(e.into()),
    }
}
