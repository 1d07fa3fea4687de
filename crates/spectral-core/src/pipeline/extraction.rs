use std::sync::OnceLock;

use serde::Serialize;
use tracing::info;

use crate::background::{clip_background, estimate_background, BackgroundStats};
use crate::error::Result;
use crate::orientation::{estimate_orientation, OrientationAngle, OrientationEstimate};
use crate::rotate::rotate_stack;
use crate::stack::{ColorPlaneStack, Roi};
use crate::window::compute_roi;

use super::config::ExtractionConfig;

/// Everything a renderer or exporter needs from one extraction.
#[derive(Clone, Debug, Serialize)]
pub struct ExtractionResult {
    pub angle: OrientationAngle,
    pub per_channel_angles: Vec<OrientationAngle>,
    /// Background of the input stack.
    pub background: Vec<BackgroundStats>,
    /// Background of the de-rotated stack, matching `stack`.
    pub derotated_background: Vec<BackgroundStats>,
    pub roi: Roi,
    /// De-rotated stack cropped to `roi`.
    #[serde(skip)]
    pub stack: ColorPlaneStack,
}

/// Lazily evaluated extraction over one immutable stack.
///
/// Each stage is computed on first access and cached for the lifetime of
/// the value. Failed stages are not cached, so a later call recomputes them.
#[derive(Debug)]
pub struct Extraction {
    stack: ColorPlaneStack,
    config: ExtractionConfig,
    background: OnceLock<Vec<BackgroundStats>>,
    clipped: OnceLock<ColorPlaneStack>,
    orientation: OnceLock<OrientationEstimate>,
    derotated: OnceLock<ColorPlaneStack>,
    derotated_background: OnceLock<Vec<BackgroundStats>>,
    roi: OnceLock<Roi>,
    cropped: OnceLock<ColorPlaneStack>,
}

/// Return the cached value, or compute and cache it.
fn cached<T>(cell: &OnceLock<T>, compute: impl FnOnce() -> Result<T>) -> Result<&T> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = compute()?;
    Ok(cell.get_or_init(|| value))
}

impl Extraction {
    pub fn new(stack: ColorPlaneStack, config: ExtractionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            stack,
            config,
            background: OnceLock::new(),
            clipped: OnceLock::new(),
            orientation: OnceLock::new(),
            derotated: OnceLock::new(),
            derotated_background: OnceLock::new(),
            roi: OnceLock::new(),
            cropped: OnceLock::new(),
        })
    }

    pub fn stack(&self) -> &ColorPlaneStack {
        &self.stack
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Sigma-clipped background statistics of the input stack.
    pub fn background(&self) -> Result<&[BackgroundStats]> {
        cached(&self.background, || {
            estimate_background(&self.stack, &self.config.sigma, self.config.max_iterations)
        })
        .map(Vec::as_slice)
    }

    /// Input stack with everything below the background cut set to NaN.
    pub fn clipped(&self) -> Result<&ColorPlaneStack> {
        cached(&self.clipped, || {
            clip_background(&self.stack, self.background()?, self.config.clipping_factor)
        })
    }

    pub fn orientation(&self) -> Result<&OrientationEstimate> {
        cached(&self.orientation, || {
            estimate_orientation(
                self.clipped()?,
                self.config.orientation,
                self.config.angle_tolerance_deg,
            )
        })
    }

    /// The unclipped input stack rotated by the estimated angle.
    pub fn derotated(&self) -> Result<&ColorPlaneStack> {
        cached(&self.derotated, || {
            Ok(rotate_stack(&self.stack, self.orientation()?.angle))
        })
    }

    pub fn derotated_background(&self) -> Result<&[BackgroundStats]> {
        cached(&self.derotated_background, || {
            estimate_background(
                self.derotated()?,
                &self.config.sigma,
                self.config.max_iterations,
            )
        })
        .map(Vec::as_slice)
    }

    pub fn roi(&self) -> Result<Roi> {
        cached(&self.roi, || {
            let subtracted = self
                .derotated()?
                .subtract_background(self.derotated_background()?)?;
            compute_roi(&subtracted, &self.config.window)
        })
        .copied()
    }

    /// De-rotated stack cropped to the ROI.
    pub fn cropped(&self) -> Result<&ColorPlaneStack> {
        cached(&self.cropped, || self.derotated()?.crop(&self.roi()?))
    }

    /// Evaluate every stage and collect the results.
    pub fn run(&self) -> Result<ExtractionResult> {
        let orientation = self.orientation()?;
        let roi = self.roi()?;
        let stack = self.cropped()?.clone();

        info!(
            angle = orientation.angle.degrees(),
            min_row = roi.min_row,
            max_row = roi.max_row,
            min_col = roi.min_col,
            max_col = roi.max_col,
            "Extraction complete"
        );

        Ok(ExtractionResult {
            angle: orientation.angle,
            per_channel_angles: orientation.per_channel.clone(),
            background: self.background()?.to_vec(),
            derotated_background: self.derotated_background()?.to_vec(),
            roi,
            stack,
        })
    }
}
