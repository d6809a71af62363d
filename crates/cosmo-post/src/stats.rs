//! Weighted summaries of recorded columns.

use cosmo_core::CosmoError;
use cosmo_core::ErrorInfo;

/// Number of leading rows dropped by a burn-in setting.
///
/// Values below one are a fraction of the chain; larger values count rows.
pub fn burn_rows(burn: f64, len: usize) -> Result<usize, CosmoError> {
    if !burn.is_finite() || burn < 0.0 {
        return Err(CosmoError::Configuration(
            ErrorInfo::new("postprocess-burn", "burn-in must be a non-negative number")
                .with_context("burn", burn.to_string()),
        ));
    }
    let rows = if burn < 1.0 {
        (burn * len as f64).floor() as usize
    } else {
        burn.floor() as usize
    };
    if rows >= len && len > 0 {
        return Err(CosmoError::Configuration(
            ErrorInfo::new("postprocess-burn", "burn-in discards every recorded row")
                .with_context("burn", burn.to_string())
                .with_context("rows", len.to_string()),
        ));
    }
    Ok(rows)
}

/// Normalises log weights so the largest weight is one.
pub fn weights_from_log(log_weights: &[f64]) -> Vec<f64> {
    let peak = log_weights
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    log_weights
        .iter()
        .map(|value| {
            if value.is_finite() && peak.is_finite() {
                (value - peak).exp()
            } else {
                0.0
            }
        })
        .collect()
}

/// Weighted mean and standard deviation over finite, positively weighted values.
pub fn weighted_moments(values: &[f64], weights: &[f64]) -> Option<(f64, f64)> {
    let mut total = 0.0;
    let mut sum = 0.0;
    for (value, weight) in usable(values, weights) {
        total += weight;
        sum += weight * value;
    }
    if total <= 0.0 {
        return None;
    }
    let mean = sum / total;
    let variance = usable(values, weights)
        .map(|(value, weight)| weight * (value - mean).powi(2))
        .sum::<f64>()
        / total;
    Some((mean, variance.sqrt()))
}

/// Index of the largest finite value.
pub fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, value)| value.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (idx, &value)| match best {
            Some((_, top)) if top >= value => best,
            _ => Some((idx, value)),
        })
        .map(|(idx, _)| idx)
}

fn usable<'a>(values: &'a [f64], weights: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
    values
        .iter()
        .zip(weights)
        .filter(|(value, weight)| value.is_finite() && weight.is_finite() && **weight > 0.0)
        .map(|(value, weight)| (*value, *weight))
}

/// Closed interval covered by a set of values, padded when degenerate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub lo: f64,
    pub hi: f64,
}

impl Span {
    /// Range of the finite entries of `values`.
    pub fn of(values: &[f64]) -> Option<Self> {
        let (lo, hi) = values
            .iter()
            .copied()
            .filter(|value| value.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), value| {
                (lo.min(value), hi.max(value))
            });
        if lo > hi {
            return None;
        }
        Some(Self { lo, hi }.padded())
    }

    /// Widens the span to include `value`.
    pub fn including(self, value: f64) -> Self {
        if !value.is_finite() {
            return self;
        }
        Self {
            lo: self.lo.min(value),
            hi: self.hi.max(value),
        }
    }

    fn padded(self) -> Self {
        if self.hi > self.lo {
            return self;
        }
        let pad = (self.lo.abs() * 0.05).max(0.5);
        Self {
            lo: self.lo - pad,
            hi: self.hi + pad,
        }
    }

    fn bin(&self, bins: usize, value: f64) -> usize {
        let scaled = (value - self.lo) / (self.hi - self.lo) * bins as f64;
        (scaled.floor().max(0.0) as usize).min(bins - 1)
    }

    fn edge(&self, bins: usize, idx: usize) -> f64 {
        self.lo + (self.hi - self.lo) * idx as f64 / bins as f64
    }
}

/// Weighted one-dimensional histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub span: Span,
    pub counts: Vec<f64>,
}

impl Histogram {
    /// Bins the finite values; `None` when no value is finite.
    pub fn weighted(values: &[f64], weights: &[f64], bins: usize) -> Option<Self> {
        let span = Span::of(values)?;
        let bins = bins.max(1);
        let mut counts = vec![0.0; bins];
        for (value, weight) in usable(values, weights) {
            counts[span.bin(bins, value)] += weight;
        }
        Some(Self { span, counts })
    }

    pub fn peak(&self) -> f64 {
        self.counts.iter().copied().fold(0.0, f64::max)
    }

    /// `(left edge, right edge, weight)` per bin.
    pub fn bars(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        let bins = self.counts.len();
        self.counts.iter().enumerate().map(move |(idx, count)| {
            (
                self.span.edge(bins, idx),
                self.span.edge(bins, idx + 1),
                *count,
            )
        })
    }
}

/// Weighted two-dimensional histogram, stored row-major over `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2d {
    pub x: Span,
    pub y: Span,
    pub x_bins: usize,
    pub y_bins: usize,
    pub counts: Vec<f64>,
}

impl Histogram2d {
    /// Bins the pairs where both coordinates are finite.
    pub fn weighted(
        xs: &[f64],
        ys: &[f64],
        weights: &[f64],
        x_bins: usize,
        y_bins: usize,
    ) -> Option<Self> {
        let (x_bins, y_bins) = (x_bins.max(1), y_bins.max(1));
        let paired: Vec<(f64, f64, f64)> = xs
            .iter()
            .zip(ys)
            .zip(weights)
            .filter(|((x, y), w)| x.is_finite() && y.is_finite() && w.is_finite() && **w > 0.0)
            .map(|((x, y), w)| (*x, *y, *w))
            .collect();
        let x = Span::of(&paired.iter().map(|(x, _, _)| *x).collect::<Vec<_>>())?;
        let y = Span::of(&paired.iter().map(|(_, y, _)| *y).collect::<Vec<_>>())?;
        let mut counts = vec![0.0; x_bins * y_bins];
        for (px, py, weight) in paired {
            counts[y.bin(y_bins, py) * x_bins + x.bin(x_bins, px)] += weight;
        }
        Some(Self {
            x,
            y,
            x_bins,
            y_bins,
            counts,
        })
    }

    pub fn peak(&self) -> f64 {
        self.counts.iter().copied().fold(0.0, f64::max)
    }

    /// `((x0, y0), (x1, y1), weight)` for every non-empty cell.
    pub fn cells(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64), f64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0.0)
            .map(move |(idx, count)| {
                let (row, col) = (idx / self.x_bins, idx % self.x_bins);
                (
                    (self.x.edge(self.x_bins, col), self.y.edge(self.y_bins, row)),
                    (
                        self.x.edge(self.x_bins, col + 1),
                        self.y.edge(self.y_bins, row + 1),
                    ),
                    *count,
                )
            })
    }
}

/// Sums `weights` over each distinct value of `values`, sorted by value.
pub fn grid_marginal(values: &[f64], weights: &[f64]) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = values
        .iter()
        .zip(weights)
        .filter(|(value, weight)| value.is_finite() && weight.is_finite())
        .map(|(value, weight)| (*value, *weight))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut marginal: Vec<(f64, f64)> = Vec::new();
    for (value, weight) in pairs {
        match marginal.last_mut() {
            Some((last, total)) if *last == value => *total += weight,
            _ => marginal.push((value, weight)),
        }
    }
    marginal
}

/// Number of distinct finite values.
pub fn distinct(values: &[f64]) -> usize {
    let ones = vec![1.0; values.len()];
    grid_marginal(values, &ones).len()
}
