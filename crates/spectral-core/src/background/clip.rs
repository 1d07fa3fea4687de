use crate::error::{Result, SpectralError};
use crate::stack::ColorPlaneStack;

use super::stats::BackgroundStats;

/// Invalidate every pixel below `mean + factor * stddev` of its channel.
///
/// Non-finite input pixels stay invalid. The result uses NaN for every
/// rejected pixel; the input stack is left untouched.
pub fn clip_background(
    stack: &ColorPlaneStack,
    stats: &[BackgroundStats],
    factor: f64,
) -> Result<ColorPlaneStack> {
    if !(factor.is_finite() && factor > 0.0) {
        return Err(SpectralError::Configuration(format!(
            "clipping factor must be finite and > 0, got {factor}"
        )));
    }
    if stats.len() != stack.channel_count() {
        return Err(SpectralError::Configuration(format!(
            "{} background entries for {} channels",
            stats.len(),
            stack.channel_count()
        )));
    }

    let thresholds: Vec<f64> = stats.iter().map(|s| s.mean + factor * s.stddev).collect();
    Ok(mask_below(stack, &thresholds))
}

fn mask_below(stack: &ColorPlaneStack, thresholds: &[f64]) -> ColorPlaneStack {
    let mut data = stack.data().clone();
    for (mut plane, &threshold) in data.outer_iter_mut().zip(thresholds) {
        plane.mapv_inplace(|v| {
            if v.is_finite() && v as f64 >= threshold {
                v
            } else {
                f32::NAN
            }
        });
    }
    stack.with_data(data)
}
