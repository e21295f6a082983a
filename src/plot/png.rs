//! Two-panel diagnostic PNG rendered with Plotters.
//!
//! - left: observed `(x, y)` points with the fitted model curve
//! - right: `x(t)` and `y(t)`, data vs. model, against `t`
//!
//! Plotters is built without a font backend and its text path panics, so the
//! panels carry no captions, tick labels or legend text. Series colors are
//! fixed (see the constants below) and the grid stays for scale.

use std::path::Path;

use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::domain::{Observations, Params};
use crate::error::{AppError, EXIT_OUTPUT};
use crate::models::predict_all;
use crate::plot::model_curve;

/// Number of model samples traced across the `t` range in the XY panel.
const CURVE_SAMPLES: usize = 600;

const DATA_COLOR: RGBColor = RGBColor(31, 119, 180);
const MODEL_COLOR: RGBColor = RGBColor(214, 39, 40);
const X_MODEL_COLOR: RGBColor = RGBColor(255, 127, 14);
const Y_DATA_COLOR: RGBColor = RGBColor(44, 160, 44);
const Y_MODEL_COLOR: RGBColor = RGBColor(148, 103, 189);

/// Render the diagnostic plot to `path` (overwritten).
pub fn write_fit_plot(
    path: &Path,
    obs: &Observations,
    fitted: &Params,
    width: u32,
    height: u32,
) -> Result<(), AppError> {
    draw_fit_plot(path, obs, fitted, (width.max(200), height.max(100))).map_err(|e| {
        AppError::new(
            EXIT_OUTPUT,
            format!("Failed to render plot '{}': {e}", path.display()),
        )
    })
}

fn draw_fit_plot(
    path: &Path,
    obs: &Observations,
    fitted: &Params,
    size: (u32, u32),
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    draw_panels(&root, obs, fitted)?;
    root.present()?;
    Ok(())
}

fn draw_panels<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    obs: &Observations,
    fitted: &Params,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    let (width, _) = root.dim_in_pixel();
    let (left, right) = root.split_horizontally(width / 2);
    draw_xy_panel(&left, obs, fitted)?;
    draw_time_panel(&right, obs, fitted)
}

/// Gridlines and a frame only; no label areas, so nothing reaches the text path.
fn draw_frame<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    chart.configure_mesh().draw()?;
    let area = chart.plotting_area();
    let (xr, yr) = (area.get_x_range(), area.get_y_range());
    area.draw(&Rectangle::new([(xr.start, yr.start), (xr.end, yr.end)], BLACK))?;
    Ok(())
}

fn draw_xy_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    obs: &Observations,
    fitted: &Params,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let curve: Vec<(f64, f64)> = model_curve(obs, fitted, CURVE_SAMPLES)
        .into_iter()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();

    let (x0, x1) = padded_range(obs.x.iter().copied().chain(curve.iter().map(|p| p.0)));
    let (y0, y1) = padded_range(obs.y.iter().copied().chain(curve.iter().map(|p| p.1)));

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    draw_frame(&mut chart)?;

    chart.draw_series(
        obs.x
            .iter()
            .zip(obs.y.iter())
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(&x, &y)| Circle::new((x, y), 2, DATA_COLOR.filled())),
    )?;
    chart.draw_series(LineSeries::new(curve, MODEL_COLOR.stroke_width(2)))?;

    Ok(())
}

fn draw_time_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    obs: &Observations,
    fitted: &Params,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    // Lines are traced in increasing `t`; input rows need not be sorted.
    let mut order: Vec<usize> = (0..obs.len()).collect();
    order.sort_by(|&a, &b| obs.t[a].partial_cmp(&obs.t[b]).unwrap_or(std::cmp::Ordering::Equal));

    let t: Vec<f64> = order.iter().map(|&i| obs.t[i]).collect();
    let x_data: Vec<f64> = order.iter().map(|&i| obs.x[i]).collect();
    let y_data: Vec<f64> = order.iter().map(|&i| obs.y[i]).collect();
    let (x_model, y_model) = predict_all(fitted, &t);

    let (t0, t1) = padded_range(t.iter().copied());
    let (v0, v1) = padded_range(
        x_data
            .iter()
            .chain(&y_data)
            .chain(&x_model)
            .chain(&y_model)
            .copied(),
    );

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .build_cartesian_2d(t0..t1, v0..v1)?;
    draw_frame(&mut chart)?;

    let series: [(&[f64], RGBColor); 4] = [
        (&x_data, DATA_COLOR),
        (&x_model, X_MODEL_COLOR),
        (&y_data, Y_DATA_COLOR),
        (&y_model, Y_MODEL_COLOR),
    ];

    for (values, color) in series {
        let points: Vec<(f64, f64)> = t
            .iter()
            .copied()
            .zip(values.iter().copied())
            .filter(|(a, b)| a.is_finite() && b.is_finite())
            .collect();
        chart.draw_series(LineSeries::new(points, color.stroke_width(2)))?;
    }

    Ok(())
}

/// Finite min/max of `values` padded by 5%, never empty.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    if hi - lo < 1e-12 {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}
