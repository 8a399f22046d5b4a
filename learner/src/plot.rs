use std::{fmt::Display, num::NonZeroUsize, ops::Range, path::Path};

use plotters::{coord::Shift, prelude::*};

use crate::{LearnerErr, Result};

const PREDICTION_COLOR: RGBColor = RGBColor(128, 128, 128);
const MARGIN: u32 = 10;

/// One function of a few-shot figure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panel {
    /// The true curve, sorted by `x`.
    pub ground_truth: Vec<(f32, f32)>,
    /// The points the predictions are conditioned on.
    pub context: Vec<(f32, f32)>,
    /// Each predictive curve drawn for this context.
    pub predictions: Vec<Vec<(f32, f32)>>,
}

impl Panel {
    fn points(&self) -> impl Iterator<Item = &(f32, f32)> {
        self.ground_truth
            .iter()
            .chain(&self.context)
            .chain(self.predictions.iter().flatten())
    }

    /// The ranges every finite point of the panel fits in, with some room on the `y` axis.
    pub fn bounds(&self) -> (Range<f32>, Range<f32>) {
        let (mut x_lo, mut x_hi) = (f32::INFINITY, f32::NEG_INFINITY);
        let (mut y_lo, mut y_hi) = (f32::INFINITY, f32::NEG_INFINITY);

        for &(x, y) in self.points().filter(|(x, y)| x.is_finite() && y.is_finite()) {
            x_lo = x_lo.min(x);
            x_hi = x_hi.max(x);
            y_lo = y_lo.min(y);
            y_hi = y_hi.max(y);
        }

        let pad = (y_hi - y_lo) * 0.1;
        (widen(x_lo, x_hi, 0.), widen(y_lo, y_hi, pad))
    }
}

fn widen(lo: f32, hi: f32, pad: f32) -> Range<f32> {
    if lo > hi {
        return -1.0..1.0;
    }

    if lo == hi {
        return lo - 1.0..hi + 1.0;
    }

    lo - pad..hi + pad
}

fn plot_err<E: Display>(e: E) -> LearnerErr {
    LearnerErr::Plot(e.to_string())
}

/// Draws the panels on a grid and writes the figure to `path`.
///
/// `.svg` paths are written as vector graphics, any other extension goes through the bitmap
/// encoder. Nothing textual is drawn, so no fonts are needed.
///
/// # Arguments
/// * `path` - Where the figure is written.
/// * `panels` - The panels in row major order.
/// * `columns` - The amount of panels per row.
/// * `size` - The `(width, height)` of the figure in pixels.
pub fn render_panels(
    path: &Path,
    panels: &[Panel],
    columns: NonZeroUsize,
    size: (u32, u32),
) -> Result<()> {
    let is_svg = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    if is_svg {
        draw(SVGBackend::new(path, size).into_drawing_area(), panels, columns)
    } else {
        draw(BitMapBackend::new(path, size).into_drawing_area(), panels, columns)
    }
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    panels: &[Panel],
    columns: NonZeroUsize,
) -> Result<()> {
    root.fill(&WHITE).map_err(plot_err)?;

    let columns = columns.get();
    let rows = panels.len().div_ceil(columns);
    if rows > 0 {
        let areas = root.split_evenly((rows, columns));
        for (area, panel) in areas.iter().zip(panels) {
            draw_panel(area, panel)?;
        }
    }

    root.present().map_err(plot_err)
}

fn draw_panel<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, panel: &Panel) -> Result<()> {
    let (x_range, y_range) = panel.bounds();
    let mut chart = ChartBuilder::on(area)
        .margin(MARGIN)
        .build_cartesian_2d(x_range.clone(), y_range)
        .map_err(plot_err)?;

    let (w, h) = chart.plotting_area().dim_in_pixel();
    let frame = Rectangle::new([(0, 0), (w as i32 - 1, h as i32 - 1)], BLACK.mix(0.4));
    chart
        .plotting_area()
        .strip_coord_spec()
        .draw(&frame)
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            [(x_range.start, 0.), (x_range.end, 0.)],
            BLACK.mix(0.15),
        ))
        .map_err(plot_err)?;

    for prediction in &panel.predictions {
        chart
            .draw_series(LineSeries::new(
                prediction.iter().copied(),
                PREDICTION_COLOR.mix(0.5),
            ))
            .map_err(plot_err)?;
    }

    chart
        .draw_series(LineSeries::new(
            panel.ground_truth.iter().copied(),
            BLUE.stroke_width(2),
        ))
        .map_err(plot_err)?;

    chart
        .draw_series(
            panel
                .context
                .iter()
                .map(|&point| Circle::new(point, 4, RED.filled())),
        )
        .map_err(plot_err)?;

    Ok(())
}
