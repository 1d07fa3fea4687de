//! Intensity histograms of the signal left after background clipping.

use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::background::BackgroundStats;
use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{Result, SpectralError};
use crate::stack::ColorPlaneStack;

/// Equal-width histogram of one channel.
///
/// `edges` holds `counts.len() + 1` ascending bin boundaries. Every bin is
/// half-open except the last, which also includes its upper edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Total number of binned pixels.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Histogram per channel of the pixels at or above `mean + factor * stddev`.
///
/// Bins span the range of the selected pixels. A channel whose selected
/// pixels are all equal gets a unit-wide range centered on that value, and a
/// channel with nothing selected gets `[0, 1]` with zero counts. Non-finite
/// pixels are never counted.
pub fn signal_histogram(
    stack: &ColorPlaneStack,
    stats: &[BackgroundStats],
    factor: f64,
    bins: usize,
) -> Result<Vec<Histogram>> {
    if bins == 0 {
        return Err(SpectralError::Configuration(
            "histogram needs at least one bin".into(),
        ));
    }
    if !factor.is_finite() {
        return Err(SpectralError::Configuration(format!(
            "clipping factor must be finite, got {factor}"
        )));
    }
    if stats.len() != stack.channel_count() {
        return Err(SpectralError::Configuration(format!(
            "{} background entries for {} channels",
            stats.len(),
            stack.channel_count()
        )));
    }

    let (rows, cols) = stack.plane_dim();
    let threshold = |st: &BackgroundStats| st.mean + factor * st.stddev;

    let histograms: Vec<Histogram> = if rows * cols >= PARALLEL_PIXEL_THRESHOLD {
        stats
            .par_iter()
            .enumerate()
            .map(|(idx, st)| channel_histogram(stack.plane(idx), threshold(st), bins))
            .collect()
    } else {
        stats
            .iter()
            .enumerate()
            .map(|(idx, st)| channel_histogram(stack.plane(idx), threshold(st), bins))
            .collect()
    };

    for (channel, hist) in stack.channels().iter().zip(&histograms) {
        debug!(channel = %channel, pixels = hist.total(), "Signal histogram");
    }

    Ok(histograms)
}

fn channel_histogram(plane: ArrayView2<f32>, threshold: f64, bins: usize) -> Histogram {
    let values: Vec<f64> = plane
        .iter()
        .map(|&v| v as f64)
        .filter(|v| v.is_finite() && *v >= threshold)
        .collect();

    let (lo, hi) = match value_range(&values) {
        None => (0.0, 1.0),
        Some((lo, hi)) if lo == hi => (lo - 0.5, hi + 0.5),
        Some(range) => range,
    };

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins)
        .map(|i| if i == bins { hi } else { lo + width * i as f64 })
        .collect();

    let mut counts = vec![0usize; bins];
    let scale = bins as f64 / (hi - lo);
    for v in values {
        let idx = (((v - lo) * scale) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Histogram { edges, counts }
}

fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |range, &v| match range {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
