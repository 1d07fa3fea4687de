//! Region-of-interest windowing from weighted centroids.
//!
//! A background-subtracted, de-rotated stack is collapsed into 1D profiles.
//! Each profile is read as a weight distribution over pixel indices; the
//! window spans one weighted standard deviation around the weighted mean.

use tracing::{debug, warn};

use crate::error::{Result, SpectralError};
use crate::pipeline::config::{ChannelCombine, WindowConfig};
use crate::profile::{column_profile, row_profile, Reduction};
use crate::stack::{ColorPlaneStack, Roi};

/// Weighted centroid and weighted spread of a profile.
///
/// Only entries with a finite weight take part. Returns `(centroid, spread)`
/// in index units.
pub fn weighted_centroid(profile: &[f64]) -> Result<(f64, f64)> {
    let mut sum_w = 0.0f64;
    let mut sum_iw = 0.0f64;
    let mut valid = 0usize;
    for (i, &w) in profile.iter().enumerate() {
        if w.is_finite() {
            sum_w += w;
            sum_iw += i as f64 * w;
            valid += 1;
        }
    }

    if valid == 0 {
        return Err(SpectralError::EmptyWindow(
            "profile has no finite weights".into(),
        ));
    }
    if sum_w == 0.0 || !sum_w.is_finite() {
        return Err(SpectralError::EmptyWindow(format!(
            "profile weights sum to {sum_w}"
        )));
    }

    let centroid = sum_iw / sum_w;

    let mut sum_sq = 0.0f64;
    for (i, &w) in profile.iter().enumerate() {
        if w.is_finite() {
            let d = i as f64 - centroid;
            sum_sq += w * d * d;
        }
    }
    let mut variance = sum_sq / sum_w;
    if variance < 0.0 {
        warn!(variance, centroid, "Negative weighted variance, using its magnitude");
        variance = -variance;
    }

    Ok((centroid, variance.sqrt()))
}

fn in_context(err: SpectralError, context: &str) -> SpectralError {
    match err {
        SpectralError::EmptyWindow(msg) => SpectralError::EmptyWindow(format!("{context}: {msg}")),
        other => other,
    }
}

/// `[floor(lo), ceil(hi)]` clamped to `[0, len - 1]`, then padded and re-clamped.
fn window_bounds(lo: f64, hi: f64, len: usize, padding: usize) -> (usize, usize) {
    let last = len.saturating_sub(1);
    let clamp = |v: f64| v.clamp(0.0, last as f64) as usize;
    let min = clamp(lo.floor()).saturating_sub(padding);
    let max = clamp(hi.ceil()).saturating_add(padding).min(last);
    (min, max)
}

/// Cross-dispersion window shared by all channels.
pub fn find_rows(subtracted: &ColorPlaneStack, padding: usize) -> Result<(usize, usize)> {
    let profile = row_profile(subtracted, Reduction::Mean);
    let (center, spread) =
        weighted_centroid(&profile).map_err(|e| in_context(e, "row axis"))?;
    debug!(center, spread, "Row profile centroid");
    Ok(window_bounds(
        center - spread,
        center + spread,
        subtracted.rows(),
        padding,
    ))
}

/// Dispersion-axis window merged from per-channel extents.
pub fn find_columns(
    subtracted: &ColorPlaneStack,
    combine: ChannelCombine,
    padding: usize,
) -> Result<(usize, usize)> {
    let mut extents = Vec::with_capacity(subtracted.channel_count());
    for (channel, plane) in subtracted.channels().iter().zip(subtracted.planes()) {
        let profile = column_profile(plane, Reduction::Mean);
        let (center, spread) = weighted_centroid(&profile)
            .map_err(|e| in_context(e, &format!("column axis, channel {channel}")))?;
        debug!(channel = %channel, center, spread, "Column profile centroid");
        extents.push((center - spread, center + spread));
    }

    let (lo, hi) = match combine {
        ChannelCombine::Union => extents.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), &(a, b)| (lo.min(a), hi.max(b)),
        ),
        ChannelCombine::Intersection => extents.iter().fold(
            (f64::NEG_INFINITY, f64::INFINITY),
            |(lo, hi), &(a, b)| (lo.max(a), hi.min(b)),
        ),
    };

    if lo > hi {
        return Err(SpectralError::EmptyWindow(format!(
            "channel extents do not overlap ({lo:.1} > {hi:.1})"
        )));
    }

    Ok(window_bounds(lo, hi, subtracted.cols(), padding))
}

/// Compute the ROI of a background-subtracted, de-rotated stack.
pub fn compute_roi(subtracted: &ColorPlaneStack, config: &WindowConfig) -> Result<Roi> {
    let (min_row, max_row) = find_rows(subtracted, config.border_padding)?;

    let (min_col, max_col) = if config.cut_spectrum {
        find_columns(subtracted, config.channel_combine, config.border_padding)?
    } else {
        (0, usize::MAX)
    };

    let roi = Roi {
        min_row,
        max_row,
        min_col,
        max_col,
    };
    Ok(roi.clamped_to(subtracted.rows(), subtracted.cols()))
}
