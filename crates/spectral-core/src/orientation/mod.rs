//! Rotation-angle recovery.
//!
//! Finds the angle of a bright source's principal axis, measured from the
//! column axis towards increasing row index. Two interchangeable methods are
//! available: second-order image moments on the clipped plane, and an SVD of
//! the coordinates of a binarized plane. Both yield angles in (-90, 90].

pub mod moments;
pub mod svd;

use std::fmt;

use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{Result, SpectralError};
use crate::stack::ColorPlaneStack;

pub use moments::ImageMoments;

/// Orientation recovery method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrientationMethod {
    /// Second-order central image moments, weighted by pixel value.
    #[default]
    Moments,
    /// Binarize at the plane mean, then SVD of the foreground coordinates.
    BinarizeSvd,
}

impl fmt::Display for OrientationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Moments => write!(f, "Image moments"),
            Self::BinarizeSvd => write!(f, "Binarize + SVD"),
        }
    }
}

/// Rotation angle in degrees, always normalized into (-90, 90].
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrientationAngle(f64);

impl OrientationAngle {
    pub fn from_degrees(degrees: f64) -> Self {
        Self(normalize_degrees(degrees))
    }

    pub fn from_radians(radians: f64) -> Self {
        Self::from_degrees(radians.to_degrees())
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }

    pub fn radians(&self) -> f64 {
        self.0.to_radians()
    }
}

impl fmt::Display for OrientationAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}\u{00b0}", self.0)
    }
}

/// Map any angle onto (-90, 90] by whole half turns.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let folded = degrees.rem_euclid(180.0);
    if folded > 90.0 {
        folded - 180.0
    } else {
        folded
    }
}

/// Stack-level orientation with the per-channel angles it was derived from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrientationEstimate {
    pub angle: OrientationAngle,
    pub per_channel: Vec<OrientationAngle>,
}

impl OrientationEstimate {
    /// Largest difference between any two channel angles, in degrees.
    pub fn spread_deg(&self) -> f64 {
        let (lo, hi) = self
            .per_channel
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), a| {
                (lo.min(a.degrees()), hi.max(a.degrees()))
            });
        if hi >= lo {
            hi - lo
        } else {
            0.0
        }
    }
}

/// Orientation of a single plane. Non-finite pixels carry no weight.
pub fn estimate_plane_angle(
    plane: ArrayView2<f32>,
    method: OrientationMethod,
) -> Result<OrientationAngle> {
    match method {
        OrientationMethod::Moments => ImageMoments::calculate(plane).orientation(),
        OrientationMethod::BinarizeSvd => svd::binarized_svd_angle(plane),
    }
}

/// Estimate one rotation angle for a clipped stack.
///
/// Every channel is measured independently and the angles are averaged.
/// A spread larger than `tolerance_deg` only produces a warning.
pub fn estimate_orientation(
    clipped: &ColorPlaneStack,
    method: OrientationMethod,
    tolerance_deg: f64,
) -> Result<OrientationEstimate> {
    let (rows, cols) = clipped.plane_dim();
    let n = clipped.channel_count();

    let per_channel: Vec<OrientationAngle> = if rows * cols >= PARALLEL_PIXEL_THRESHOLD {
        (0..n)
            .into_par_iter()
            .map(|idx| estimate_plane_angle(clipped.plane(idx), method))
            .collect::<Result<_>>()?
    } else {
        (0..n)
            .map(|idx| estimate_plane_angle(clipped.plane(idx), method))
            .collect::<Result<_>>()?
    };

    let mean_deg = per_channel.iter().map(|a| a.degrees()).sum::<f64>() / n as f64;
    if !mean_deg.is_finite() {
        return Err(SpectralError::UndefinedMoment(format!(
            "non-finite mean channel angle {mean_deg}"
        )));
    }

    let estimate = OrientationEstimate {
        angle: OrientationAngle::from_degrees(mean_deg),
        per_channel,
    };

    for (channel, angle) in clipped.channels().iter().zip(&estimate.per_channel) {
        debug!(channel = %channel, angle = angle.degrees(), "Channel orientation");
    }

    let spread = estimate.spread_deg();
    if spread > tolerance_deg {
        warn!(
            spread_deg = spread,
            tolerance_deg,
            angle = estimate.angle.degrees(),
            "Channel orientations disagree"
        );
    }

    Ok(estimate)
}
