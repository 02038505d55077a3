//! Diagnostic figures rendered as in-memory SVG documents.

use std::error::Error;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::{EvalError, Result};
use crate::metrics::Histogram;
use crate::Evaluation;

const SINGLE_SIZE: (u32, u32) = (1024, 640);
const STACKED_SIZE: (u32, u32) = (1024, 960);

const TRUTH_COLOR: RGBColor = RED;
const PREDICTION_COLOR: RGBColor = BLUE;
const AXIS_COLORS: [RGBColor; 3] = [
    RGBColor(0, 128, 0),    // green
    RGBColor(255, 140, 0),  // darkorange
    RGBColor(25, 25, 112),  // midnightblue
];
const AXIS_LABELS: [&str; 3] = ["ωx", "ωy", "ωz"];
const TIME_LABEL: &str = "Time (s)";

type DrawResult<T> = std::result::Result<T, Box<dyn Error>>;

/// One rendered figure.
#[derive(Debug, Clone)]
pub struct Figure {
    pub name: String,
    pub svg: String,
}

/// Knobs shared by every figure.
#[derive(Debug, Clone, Copy)]
pub struct PlotStyle {
    /// Samples per second of the test recordings.
    pub frame_rate: f64,
    /// Histogram bin count.
    pub bins: usize,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            bins: 25,
        }
    }
}

/// Columns of one axis as plain series, plus the shared time base.
struct Traces {
    time: Vec<f64>,
    truth: Vec<Vec<f64>>,
    predicted: Vec<Vec<f64>>,
}

impl Traces {
    fn new(eval: &Evaluation, frame_rate: f64) -> Self {
        let column = |a: &ndarray::Array2<f32>, axis: usize| -> Vec<f64> {
            a.column(axis).iter().map(|&v| f64::from(v)).collect()
        };
        let axes = eval.truth.ncols();
        Self {
            time: (0..eval.truth.nrows()).map(|i| i as f64 / frame_rate).collect(),
            truth: (0..axes).map(|a| column(&eval.truth, a)).collect(),
            predicted: (0..axes).map(|a| column(&eval.predictions, a)).collect(),
        }
    }
}

fn padded_range<'a>(values: impl Iterator<Item = &'a f64>) -> std::ops::Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return -1.0..1.0;
    }
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - pad)..(hi + pad)
}

fn axis_label(axis: usize) -> String {
    let name = AXIS_LABELS.get(axis).copied().unwrap_or("ω");
    format!("{name} (rad/s)")
}

/// Ground truth and predictions of one axis over time.
fn draw_trace(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    traces: &Traces,
    axis: usize,
    show_time_label: bool,
    legend: (SeriesLabelPosition, u32),
) -> DrawResult<()> {
    let truth = &traces.truth[axis];
    let predicted = &traces.predicted[axis];
    let t_max = traces.time.last().copied().unwrap_or(0.0).max(1e-3);
    let y_range = padded_range(truth.iter().chain(predicted.iter()));

    let mut chart = ChartBuilder::on(area)
        .margin(12)
        .x_label_area_size(if show_time_label { 48 } else { 28 })
        .y_label_area_size(72)
        .build_cartesian_2d(0.0..t_max, y_range)?;

    {
        let mut mesh = chart.configure_mesh();
        mesh.y_desc(axis_label(axis))
            .axis_desc_style(("sans-serif", 20))
            .label_style(("sans-serif", 18));
        if show_time_label {
            mesh.x_desc(TIME_LABEL);
        }
        mesh.draw()?;
    }

    let points = |series: &[f64]| -> Vec<(f64, f64)> {
        traces.time.iter().copied().zip(series.iter().copied()).collect()
    };
    chart
        .draw_series(LineSeries::new(points(truth), TRUTH_COLOR))?
        .label("Ground-truth")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], TRUTH_COLOR));
    chart
        .draw_series(LineSeries::new(points(predicted), PREDICTION_COLOR))?
        .label("Predictions")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], PREDICTION_COLOR));

    let (position, font) = legend;
    chart
        .configure_series_labels()
        .position(position)
        .label_font(("sans-serif", font))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn render(
    name: &str,
    size: (u32, u32),
    draw: impl FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> DrawResult<()>,
) -> Result<Figure> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| EvalError::plot(name, e))?;
        draw(&root).map_err(|e| EvalError::plot(name, e))?;
        root.present().map_err(|e| EvalError::plot(name, e))?;
    }
    Ok(Figure {
        name: name.to_string(),
        svg,
    })
}

fn axis_figure(traces: &Traces, axis: usize) -> Result<Figure> {
    let name = format!("omega_{}", ["x", "y", "z"].get(axis).copied().unwrap_or("axis"));
    render(&name, SINGLE_SIZE, |root| {
        draw_trace(root, traces, axis, true, (SeriesLabelPosition::UpperRight, 15))
    })
}

fn stacked_figure(traces: &Traces) -> Result<Figure> {
    let axes = traces.truth.len();
    render("stacked", STACKED_SIZE, |root| {
        let panels = root.split_evenly((axes, 1));
        for (axis, panel) in panels.iter().enumerate() {
            let last = axis + 1 == axes;
            draw_trace(panel, traces, axis, last, (SeriesLabelPosition::LowerLeft, 12))?;
        }
        Ok(())
    })
}

fn histogram_figure(hist: &Histogram) -> Result<Figure> {
    render("residual_histogram", SINGLE_SIZE, |root| {
        let lo = hist.edges[0];
        let hi = hist.edges[hist.edges.len() - 1];
        let y_max = (hist.max_percent() * 1.1).max(1.0);

        let mut chart = ChartBuilder::on(root)
            .margin(12)
            .x_label_area_size(56)
            .y_label_area_size(72)
            .build_cartesian_2d(lo..hi, 0.0..y_max)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(BLACK.mix(0.05))
            .bold_line_style(BLACK.mix(0.25))
            .x_desc("Ground-truth - Predictions (rad/s)")
            .y_desc("Frequency (%)")
            .axis_desc_style(("sans-serif", 20))
            .label_style(("sans-serif", 18))
            .draw()?;

        let columns = hist.percent.ncols();
        let width = hist.bin_width();
        let group = width * 0.85;
        let bar = group / columns.max(1) as f64;
        for axis in 0..columns {
            let color = AXIS_COLORS[axis % AXIS_COLORS.len()];
            let bars = (0..hist.bins()).map(|bin| {
                let x0 = hist.edges[bin] + (width - group) / 2.0 + bar * axis as f64;
                let pct = hist.percent[[bin, axis]];
                Rectangle::new([(x0, 0.0), (x0 + bar, pct)], color.mix(0.7).filled())
            });
            chart
                .draw_series(bars)?
                .label(AXIS_LABELS.get(axis).copied().unwrap_or("ω"))
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 6), (x + 14, y + 6)], color.mix(0.7).filled())
                });
        }
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font(("sans-serif", 20))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

/// Renders the per-axis traces, the stacked panel and the residual histogram.
pub fn render_figures(eval: &Evaluation, style: &PlotStyle) -> Result<Vec<Figure>> {
    let traces = Traces::new(eval, style.frame_rate);
    let mut figures = Vec::with_capacity(traces.truth.len() + 2);
    for axis in 0..traces.truth.len() {
        figures.push(axis_figure(&traces, axis)?);
    }
    figures.push(stacked_figure(&traces)?);

    let residuals = eval.residuals()?;
    let hist = Histogram::weighted(residuals.view(), style.bins);
    figures.push(histogram_figure(&hist)?);
    tracing::debug!(set = %eval.set_name, count = figures.len(), "figures rendered");
    Ok(figures)
}
