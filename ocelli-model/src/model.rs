use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;

use crate::error::{ModelError, Result};

/// Configuration for the CNN-BiGRU regressor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelArgs {
    /// Number of sensor channels per time step.
    pub n_features: usize,
    /// Output channels of the convolution.
    pub conv_channels: usize,
    /// Convolution window length in time steps.
    pub kernel_size: usize,
    /// Hidden size of each GRU direction.
    pub hidden_dim: usize,
    /// Regression outputs (angular velocity axes).
    pub n_outputs: usize,
}

impl Default for ModelArgs {
    fn default() -> Self {
        Self {
            n_features: 6,
            conv_channels: 16,
            kernel_size: 3,
            hidden_dim: 32,
            n_outputs: 3,
        }
    }
}

impl ModelArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects configurations that cannot produce a forward pass.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("n_features", self.n_features),
            ("conv_channels", self.conv_channels),
            ("kernel_size", self.kernel_size),
            ("hidden_dim", self.hidden_dim),
            ("n_outputs", self.n_outputs),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(ModelError::invalid_parameters(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }
}

fn uniform(rows: usize, cols: usize) -> Array2<f32> {
    let mut rng = rand::thread_rng();
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-0.1..0.1))
}

fn uniform_vec(len: usize) -> Array1<f32> {
    let mut rng = rand::thread_rng();
    Array1::from_shape_fn(len, |_| rng.gen_range(-0.1..0.1))
}

fn expect_dims(what: &str, found: (usize, usize), expected: (usize, usize)) -> Result<()> {
    if found != expected {
        return Err(ModelError::invalid_parameters(format!(
            "{what} has shape {found:?}, expected {expected:?}"
        )));
    }
    Ok(())
}

fn expect_len(what: &str, found: usize, expected: usize) -> Result<()> {
    if found != expected {
        return Err(ModelError::invalid_parameters(format!(
            "{what} has length {found}, expected {expected}"
        )));
    }
    Ok(())
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Fully connected layer.
#[derive(Clone, Debug)]
pub struct Linear {
    weight: Array2<f32>, // out x in
    bias: Option<Array1<f32>>,
}

impl Linear {
    pub fn new(in_features: usize, out_features: usize, bias: bool) -> Self {
        let weight = uniform(out_features, in_features);
        let bias = bias.then(|| uniform_vec(out_features));
        Self { weight, bias }
    }

    pub fn from_parts(weight: Array2<f32>, bias: Option<Array1<f32>>) -> Result<Self> {
        if let Some(b) = &bias {
            expect_len("linear bias", b.len(), weight.nrows())?;
        }
        Ok(Self { weight, bias })
    }

    pub fn weight(&self) -> &Array2<f32> {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Array1<f32>> {
        self.bias.as_ref()
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn forward(&self, x: &ArrayView2<f32>) -> Array2<f32> {
        let mut y = x.dot(&self.weight.t());
        if let Some(b) = &self.bias {
            y += &b.view().insert_axis(Axis(0));
        }
        y
    }
}

/// 1-D convolution over time, stride 1, no padding.
///
/// The kernel is stored flattened as `out x (kernel_size * in_channels)`,
/// time-major within each window.
#[derive(Clone, Debug)]
pub struct Conv1d {
    kernel: Linear,
    kernel_size: usize,
    in_channels: usize,
}

impl Conv1d {
    pub fn new(in_channels: usize, out_channels: usize, kernel_size: usize) -> Self {
        Self {
            kernel: Linear::new(kernel_size * in_channels, out_channels, true),
            kernel_size,
            in_channels,
        }
    }

    pub fn from_parts(
        weight: Array2<f32>,
        bias: Array1<f32>,
        in_channels: usize,
        kernel_size: usize,
    ) -> Result<Self> {
        expect_dims(
            "conv weight",
            weight.dim(),
            (bias.len(), kernel_size * in_channels),
        )?;
        Ok(Self {
            kernel: Linear::from_parts(weight, Some(bias))?,
            kernel_size,
            in_channels,
        })
    }

    pub fn kernel(&self) -> &Linear {
        &self.kernel
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub fn out_channels(&self) -> usize {
        self.kernel.out_features()
    }

    /// (T, in_channels) -> (T - kernel_size + 1, out_channels)
    pub fn forward(&self, x: &ArrayView2<f32>) -> Result<Array2<f32>> {
        let (steps, channels) = x.dim();
        if channels != self.in_channels {
            return Err(ModelError::shape_mismatch(
                "sensor channels",
                self.in_channels,
                channels,
            ));
        }
        if steps < self.kernel_size {
            return Err(ModelError::SequenceTooShort {
                len: steps,
                min: self.kernel_size,
            });
        }
        let out_steps = steps - self.kernel_size + 1;
        let window = self.kernel_size * channels;
        let mut cols = Array2::<f32>::zeros((out_steps, window));
        for (t, mut row) in cols.axis_iter_mut(Axis(0)).enumerate() {
            let patch = x.slice(s![t..t + self.kernel_size, ..]);
            for (dst, src) in row.iter_mut().zip(patch.iter()) {
                *dst = *src;
            }
        }
        Ok(self.kernel.forward(&cols.view()))
    }
}

/// GRU cell with gates stacked as (reset, update, candidate).
#[derive(Clone, Debug)]
pub struct GruCell {
    w_ih: Array2<f32>, // 3H x in
    w_hh: Array2<f32>, // 3H x H
    b_ih: Array1<f32>,
    b_hh: Array1<f32>,
    hidden: usize,
}

impl GruCell {
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        Self {
            w_ih: uniform(3 * hidden_size, input_size),
            w_hh: uniform(3 * hidden_size, hidden_size),
            b_ih: uniform_vec(3 * hidden_size),
            b_hh: uniform_vec(3 * hidden_size),
            hidden: hidden_size,
        }
    }

    pub fn from_parts(
        w_ih: Array2<f32>,
        w_hh: Array2<f32>,
        b_ih: Array1<f32>,
        b_hh: Array1<f32>,
    ) -> Result<Self> {
        if w_ih.nrows() % 3 != 0 {
            return Err(ModelError::invalid_parameters(format!(
                "gru input weight has {} rows, expected a multiple of 3",
                w_ih.nrows()
            )));
        }
        let hidden = w_ih.nrows() / 3;
        expect_dims("gru hidden weight", w_hh.dim(), (3 * hidden, hidden))?;
        expect_len("gru input bias", b_ih.len(), 3 * hidden)?;
        expect_len("gru hidden bias", b_hh.len(), 3 * hidden)?;
        Ok(Self { w_ih, w_hh, b_ih, b_hh, hidden })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden
    }

    pub fn input_size(&self) -> usize {
        self.w_ih.ncols()
    }

    /// Tensors in storage order: w_ih, w_hh, b_ih, b_hh.
    pub fn weights(&self) -> (&Array2<f32>, &Array2<f32>, &Array1<f32>, &Array1<f32>) {
        (&self.w_ih, &self.w_hh, &self.b_ih, &self.b_hh)
    }

    /// Input projections for every step at once: (T, in) -> (T, 3H).
    fn project(&self, x: &ArrayView2<f32>) -> Array2<f32> {
        x.dot(&self.w_ih.t()) + &self.b_ih.view().insert_axis(Axis(0))
    }

    /// One step given the precomputed input projection `gi`.
    fn step(&self, gi: ArrayView1<f32>, h: &Array1<f32>) -> Array1<f32> {
        let hdim = self.hidden;
        let gh = self.w_hh.dot(h) + &self.b_hh;
        Array1::from_shape_fn(hdim, |j| {
            let r = sigmoid(gi[j] + gh[j]);
            let z = sigmoid(gi[hdim + j] + gh[hdim + j]);
            let n = (gi[2 * hdim + j] + r * gh[2 * hdim + j]).tanh();
            (1.0 - z) * n + z * h[j]
        })
    }

    /// Runs the whole sequence and returns the final hidden state.
    pub fn run(&self, x: &ArrayView2<f32>, reverse: bool) -> Array1<f32> {
        let gi = self.project(x);
        let mut order: Vec<usize> = (0..gi.nrows()).collect();
        if reverse {
            order.reverse();
        }
        let mut h = Array1::<f32>::zeros(self.hidden);
        for t in order {
            h = self.step(gi.row(t), &h);
        }
        h
    }
}

/// Bidirectional GRU returning `[h_forward, h_backward]`.
#[derive(Clone, Debug)]
pub struct BiGru {
    pub forward: GruCell,
    pub backward: GruCell,
}

impl BiGru {
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        Self {
            forward: GruCell::new(input_size, hidden_size),
            backward: GruCell::new(input_size, hidden_size),
        }
    }

    pub fn output_size(&self) -> usize {
        self.forward.hidden_size() + self.backward.hidden_size()
    }

    pub fn encode(&self, x: &ArrayView2<f32>) -> Array1<f32> {
        let split = self.forward.hidden_size();
        let mut out = Array1::<f32>::zeros(self.output_size());
        out.slice_mut(s![..split]).assign(&self.forward.run(x, false));
        out.slice_mut(s![split..]).assign(&self.backward.run(x, true));
        out
    }
}

/// Convolutional front end, bidirectional GRU, linear head.
#[derive(Clone, Debug)]
pub struct CnnBiGru {
    pub args: ModelArgs,
    conv: Conv1d,
    gru: BiGru,
    head: Linear,
}

impl CnnBiGru {
    /// Randomly initialised network, used for fixtures and tests.
    pub fn new(args: ModelArgs) -> Self {
        let conv = Conv1d::new(args.n_features, args.conv_channels, args.kernel_size);
        let gru = BiGru::new(args.conv_channels, args.hidden_dim);
        let head = Linear::new(2 * args.hidden_dim, args.n_outputs, true);
        Self { args, conv, gru, head }
    }

    /// Assembles a network from trained layers, checking they fit together.
    pub fn from_parts(args: ModelArgs, conv: Conv1d, gru: BiGru, head: Linear) -> Result<Self> {
        args.validate()?;
        expect_dims(
            "conv kernel",
            conv.kernel().weight().dim(),
            (args.conv_channels, args.kernel_size * args.n_features),
        )?;
        for (name, cell) in [("forward gru", &gru.forward), ("backward gru", &gru.backward)] {
            expect_dims(
                name,
                (cell.input_size(), cell.hidden_size()),
                (args.conv_channels, args.hidden_dim),
            )?;
        }
        expect_dims(
            "head",
            head.weight().dim(),
            (args.n_outputs, 2 * args.hidden_dim),
        )?;
        Ok(Self { args, conv, gru, head })
    }

    pub fn conv(&self) -> &Conv1d {
        &self.conv
    }

    pub fn gru(&self) -> &BiGru {
        &self.gru
    }

    pub fn head(&self) -> &Linear {
        &self.head
    }

    /// Forward pass for one window of shape (T, n_features).
    pub fn forward(&self, window: &ArrayView2<f32>) -> Result<Array1<f32>> {
        let features = self.conv.forward(window)?.mapv_into(|v| v.max(0.0));
        let encoded = self.gru.encode(&features.view());
        let out = self.head.forward(&encoded.view().insert_axis(Axis(0)));
        Ok(out.row(0).to_owned())
    }
}
