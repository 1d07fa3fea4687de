use std::fmt;

use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{DEFAULT_SIGMA, PARALLEL_PIXEL_THRESHOLD, STDDEV_EPSILON};
use crate::error::{Result, SpectralError};
use crate::stack::ColorPlaneStack;

/// Rejection thresholds for iterative sigma clipping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SigmaClip {
    /// Reject values more than `sigma` standard deviations from the center.
    Symmetric { sigma: f64 },
    /// Separate thresholds below and above the center. A very large `lower`
    /// makes the clip one-sided, which keeps dark pixels in the background.
    Asymmetric { lower: f64, upper: f64 },
}

impl Default for SigmaClip {
    fn default() -> Self {
        Self::Symmetric {
            sigma: DEFAULT_SIGMA,
        }
    }
}

impl fmt::Display for SigmaClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symmetric { sigma } => write!(f, "\u{00b1}{sigma}\u{03c3}"),
            Self::Asymmetric { lower, upper } => write!(f, "-{lower}\u{03c3}/+{upper}\u{03c3}"),
        }
    }
}

impl SigmaClip {
    /// `(lower, upper)` sigma multipliers.
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Self::Symmetric { sigma } => (sigma, sigma),
            Self::Asymmetric { lower, upper } => (lower, upper),
        }
    }

    /// Smallest of the two thresholds.
    pub fn min_sigma(&self) -> f64 {
        let (lower, upper) = self.bounds();
        lower.min(upper)
    }

    pub fn validate(&self) -> Result<()> {
        let (lower, upper) = self.bounds();
        if !(lower.is_finite() && upper.is_finite() && lower > 0.0 && upper > 0.0) {
            return Err(SpectralError::Configuration(format!(
                "sigma thresholds must be finite and > 0, got {self}"
            )));
        }
        Ok(())
    }
}

/// Sigma-clipped background statistics of one channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackgroundStats {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation of the retained pixels, always >= 0.
    pub stddev: f64,
    /// Number of pixels that survived clipping.
    pub retained: usize,
    /// Clipping iterations performed.
    pub iterations: usize,
}

/// Estimate per-channel background statistics of a stack.
///
/// Channels are independent and processed in parallel for large planes.
pub fn estimate_background(
    stack: &ColorPlaneStack,
    clip: &SigmaClip,
    max_iterations: usize,
) -> Result<Vec<BackgroundStats>> {
    clip.validate()?;
    if max_iterations == 0 {
        return Err(SpectralError::Configuration(
            "sigma clipping needs at least one iteration".into(),
        ));
    }

    let (rows, cols) = stack.plane_dim();
    let n = stack.channel_count();

    let stats: Vec<BackgroundStats> = if rows * cols >= PARALLEL_PIXEL_THRESHOLD {
        (0..n)
            .into_par_iter()
            .map(|idx| channel_stats(stack.plane(idx), idx, clip, max_iterations))
            .collect::<Result<_>>()?
    } else {
        (0..n)
            .map(|idx| channel_stats(stack.plane(idx), idx, clip, max_iterations))
            .collect::<Result<_>>()?
    };

    for (channel, st) in stack.channels().iter().zip(&stats) {
        debug!(
            channel = %channel,
            mean = st.mean,
            median = st.median,
            stddev = st.stddev,
            retained = st.retained,
            iterations = st.iterations,
            "Background estimated"
        );
    }

    Ok(stats)
}

fn channel_stats(
    plane: ArrayView2<f32>,
    channel: usize,
    clip: &SigmaClip,
    max_iterations: usize,
) -> Result<BackgroundStats> {
    let values: Vec<f64> = plane
        .iter()
        .filter(|v| v.is_finite())
        .map(|&v| v as f64)
        .collect();

    sigma_clipped_stats(values, clip, max_iterations).map_err(|reason| {
        SpectralError::DegenerateStatistics { channel, reason }
    })
}

/// Iterative sigma clipping around the mean of `values`.
///
/// Stops when a pass rejects nothing, when the spread collapses to zero, or
/// after `max_iterations` passes. Statistics are computed on what remains.
/// Values must already be finite; the error is a human-readable reason.
pub fn sigma_clipped_stats(
    mut values: Vec<f64>,
    clip: &SigmaClip,
    max_iterations: usize,
) -> std::result::Result<BackgroundStats, String> {
    if values.is_empty() {
        return Err("no finite pixels".into());
    }

    let (lower, upper) = clip.bounds();
    let mut iterations = 0;

    while iterations < max_iterations {
        let (mean, stddev) = mean_stddev(&values);
        iterations += 1;
        if stddev < STDDEV_EPSILON {
            break;
        }

        let lo = mean - lower * stddev;
        let hi = mean + upper * stddev;
        let before = values.len();
        values.retain(|&v| v >= lo && v <= hi);

        if values.is_empty() {
            return Err(format!("all pixels rejected after {iterations} iterations"));
        }
        if values.len() == before {
            break;
        }
    }

    let (mean, stddev) = mean_stddev(&values);
    if !mean.is_finite() || !stddev.is_finite() {
        return Err(format!("non-finite statistics (mean {mean}, stddev {stddev})"));
    }
    let retained = values.len();
    let median = median_in_place(&mut values);

    Ok(BackgroundStats {
        mean,
        median,
        stddev,
        retained,
        iterations,
    })
}

fn mean_stddev(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn median_in_place(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) * 0.5
    }
}
