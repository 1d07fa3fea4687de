use std::fmt;

use serde::{Deserialize, Serialize};

use crate::background::SigmaClip;
use crate::consts::{
    DEFAULT_ANGLE_TOLERANCE_DEG, DEFAULT_CLIPPING_FACTOR, DEFAULT_MAX_CLIP_ITERATIONS,
};
use crate::error::{Result, SpectralError};
use crate::orientation::OrientationMethod;

/// Full configuration of a spectrum extraction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Background sigma-clipping thresholds.
    #[serde(default)]
    pub sigma: SigmaClip,
    /// Signal starts at background mean + clipping_factor * stddev.
    #[serde(default = "default_clipping_factor")]
    pub clipping_factor: f64,
    /// Hard cap on sigma-clipping passes.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub orientation: OrientationMethod,
    /// Channel angle spread (degrees) tolerated without a warning.
    #[serde(default = "default_angle_tolerance")]
    pub angle_tolerance_deg: f64,
    #[serde(default)]
    pub window: WindowConfig,
}

fn default_clipping_factor() -> f64 {
    DEFAULT_CLIPPING_FACTOR
}
fn default_max_iterations() -> usize {
    DEFAULT_MAX_CLIP_ITERATIONS
}
fn default_angle_tolerance() -> f64 {
    DEFAULT_ANGLE_TOLERANCE_DEG
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sigma: SigmaClip::default(),
            clipping_factor: DEFAULT_CLIPPING_FACTOR,
            max_iterations: DEFAULT_MAX_CLIP_ITERATIONS,
            orientation: OrientationMethod::default(),
            angle_tolerance_deg: DEFAULT_ANGLE_TOLERANCE_DEG,
            window: WindowConfig::default(),
        }
    }
}

impl ExtractionConfig {
    /// Reject out-of-domain parameters.
    pub fn validate(&self) -> Result<()> {
        self.sigma.validate()?;
        if !(self.clipping_factor.is_finite() && self.clipping_factor > 0.0) {
            return Err(SpectralError::Configuration(format!(
                "clipping factor must be finite and > 0, got {}",
                self.clipping_factor
            )));
        }
        if self.max_iterations == 0 {
            return Err(SpectralError::Configuration(
                "max_iterations must be at least 1".into(),
            ));
        }
        if !(self.angle_tolerance_deg.is_finite() && self.angle_tolerance_deg >= 0.0) {
            return Err(SpectralError::Configuration(format!(
                "angle tolerance must be finite and >= 0, got {}",
                self.angle_tolerance_deg
            )));
        }
        Ok(())
    }
}

/// How per-channel dispersion-axis windows are merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelCombine {
    /// Smallest window containing every channel's extent.
    #[default]
    Union,
    /// Only the columns every channel's extent covers.
    Intersection,
}

impl fmt::Display for ChannelCombine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Union => write!(f, "Union"),
            Self::Intersection => write!(f, "Intersection"),
        }
    }
}

/// Region-of-interest windowing options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Crop along the dispersion (column) axis as well.
    #[serde(default = "default_cut_spectrum")]
    pub cut_spectrum: bool,
    /// Symmetric padding in pixels added to each computed window.
    #[serde(default)]
    pub border_padding: usize,
    #[serde(default)]
    pub channel_combine: ChannelCombine,
}

fn default_cut_spectrum() -> bool {
    true
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            cut_spectrum: true,
            border_padding: 0,
            channel_combine: ChannelCombine::default(),
        }
    }
}
