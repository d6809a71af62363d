//! Bitmap rendering of diagnostic plots.
//!
//! Plots carry no text so that rendering does not depend on system fonts.

use std::error::Error;
use std::path::Path;

use cosmo_core::{CosmoError, ErrorInfo};
use plotters::prelude::*;

use crate::stats::{Histogram, Histogram2d, Span};

const SIZE: (u32, u32) = (640, 480);
const MARGIN: u32 = 16;

type DrawResult = Result<(), Box<dyn Error>>;

/// Bar chart of a weighted histogram with an optional truth marker.
pub fn histogram(path: &Path, hist: &Histogram, truth: Option<f64>) -> Result<(), CosmoError> {
    wrap(path, draw_histogram(path, hist, truth))
}

/// Polyline through `points` with dots at each point.
pub fn curve(path: &Path, points: &[(f64, f64)], truth: Option<f64>) -> Result<(), CosmoError> {
    wrap(path, draw_curve(path, points, truth))
}

/// Shaded density of a 2-D histogram with an optional truth crosshair.
pub fn density(
    path: &Path,
    hist: &Histogram2d,
    truth: (Option<f64>, Option<f64>),
) -> Result<(), CosmoError> {
    wrap(path, draw_density(path, hist, truth))
}

/// Single vertical marker at `value`.
pub fn marker(path: &Path, value: f64, truth: Option<f64>) -> Result<(), CosmoError> {
    wrap(path, draw_marker(path, value, truth))
}

fn draw_histogram(path: &Path, hist: &Histogram, truth: Option<f64>) -> DrawResult {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let span = truth.map_or(hist.span, |value| hist.span.including(value));
    let top = hist.peak().max(f64::MIN_POSITIVE) * 1.1;
    let mut chart = ChartBuilder::on(&root)
        .margin(MARGIN)
        .build_cartesian_2d(span.lo..span.hi, 0.0..top)?;
    chart.draw_series(hist.bars().map(|(left, right, count)| {
        Rectangle::new([(left, 0.0), (right, count)], BLUE.mix(0.6).filled())
    }))?;
    if let Some(x) = truth {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, 0.0), (x, top)],
            RED.stroke_width(2),
        )))?;
    }
    root.present()?;
    Ok(())
}

fn draw_curve(path: &Path, points: &[(f64, f64)], truth: Option<f64>) -> DrawResult {
    let xs: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
    let ys: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
    let x_span = fallback(Span::of(&xs));
    let x_span = truth.map_or(x_span, |value| x_span.including(value));
    let y_span = fallback(Span::of(&ys));
    let pad = 0.05 * (y_span.hi - y_span.lo);

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(MARGIN)
        .build_cartesian_2d(x_span.lo..x_span.hi, (y_span.lo - pad)..(y_span.hi + pad))?;
    let finite: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    chart.draw_series(std::iter::once(PathElement::new(finite.clone(), &BLUE)))?;
    chart.draw_series(
        finite
            .iter()
            .map(|point| Circle::new(*point, 3, BLUE.filled())),
    )?;
    if let Some(x) = truth {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, y_span.lo - pad), (x, y_span.hi + pad)],
            RED.stroke_width(2),
        )))?;
    }
    root.present()?;
    Ok(())
}

fn draw_density(path: &Path, hist: &Histogram2d, truth: (Option<f64>, Option<f64>)) -> DrawResult {
    let x_span = truth.0.map_or(hist.x, |value| hist.x.including(value));
    let y_span = truth.1.map_or(hist.y, |value| hist.y.including(value));
    let peak = hist.peak().max(f64::MIN_POSITIVE);

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(MARGIN)
        .build_cartesian_2d(x_span.lo..x_span.hi, y_span.lo..y_span.hi)?;
    chart.draw_series(hist.cells().map(|(corner, opposite, count)| {
        Rectangle::new([corner, opposite], BLUE.mix(0.1 + 0.9 * count / peak).filled())
    }))?;
    if let Some(x) = truth.0 {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, y_span.lo), (x, y_span.hi)],
            RED.stroke_width(2),
        )))?;
    }
    if let Some(y) = truth.1 {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x_span.lo, y), (x_span.hi, y)],
            RED.stroke_width(2),
        )))?;
    }
    root.present()?;
    Ok(())
}

fn draw_marker(path: &Path, value: f64, truth: Option<f64>) -> DrawResult {
    let span = fallback(Span::of(&[value]));
    let span = truth.map_or(span, |truth| span.including(truth));
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(MARGIN)
        .build_cartesian_2d(span.lo..span.hi, 0.0..1.0)?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(value, 0.0), (value, 1.0)],
        BLUE.stroke_width(3),
    )))?;
    if let Some(x) = truth {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, 0.0), (x, 1.0)],
            RED.stroke_width(2),
        )))?;
    }
    root.present()?;
    Ok(())
}

fn fallback(span: Option<Span>) -> Span {
    span.unwrap_or(Span { lo: -1.0, hi: 1.0 })
}

fn wrap(path: &Path, result: DrawResult) -> Result<(), CosmoError> {
    result.map_err(|err| {
        CosmoError::Output(
            ErrorInfo::new("plot-render", "failed to render diagnostic plot")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })
}
