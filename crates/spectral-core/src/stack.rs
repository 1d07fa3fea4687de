use std::fmt;

use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::background::BackgroundStats;
use crate::consts::MONO_CHANNEL;
use crate::error::{Result, SpectralError};

/// Logical color channel label, e.g. `R`, `G`, `B` or `L` for luminance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel(pub char);

impl Channel {
    /// Parse a channel-order descriptor such as `"RGBG"` into labels.
    pub fn parse_all(descriptor: &str) -> Vec<Channel> {
        descriptor
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| Channel(c.to_ascii_uppercase()))
            .collect()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Color/Bayer mode of the source data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    Mono,
    #[default]
    BayerRGGB,
    BayerGRBG,
    BayerGBRG,
    BayerBGGR,
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mono => write!(f, "Mono"),
            Self::BayerRGGB => write!(f, "Bayer RGGB"),
            Self::BayerGRBG => write!(f, "Bayer GRBG"),
            Self::BayerGBRG => write!(f, "Bayer GBRG"),
            Self::BayerBGGR => write!(f, "Bayer BGGR"),
        }
    }
}

/// Region of interest with inclusive bounds on both axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub min_row: usize,
    pub max_row: usize,
    pub min_col: usize,
    pub max_col: usize,
}

impl Roi {
    /// ROI covering a whole `rows x cols` plane.
    pub fn full(rows: usize, cols: usize) -> Self {
        Self {
            min_row: 0,
            max_row: rows.saturating_sub(1),
            min_col: 0,
            max_col: cols.saturating_sub(1),
        }
    }

    /// Number of rows inside the ROI.
    pub fn rows(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    /// Number of columns inside the ROI.
    pub fn cols(&self) -> usize {
        self.max_col - self.min_col + 1
    }

    /// Same ROI with its bounds pulled inside a `rows x cols` plane.
    pub fn clamped_to(&self, rows: usize, cols: usize) -> Self {
        let last_row = rows.saturating_sub(1);
        let last_col = cols.saturating_sub(1);
        Self {
            min_row: self.min_row.min(last_row),
            max_row: self.max_row.min(last_row),
            min_col: self.min_col.min(last_col),
            max_col: self.max_col.min(last_col),
        }
    }

    /// Whether the pixel at `(row, col)` lies inside the ROI, bounds included.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.min_row..=self.max_row).contains(&row) && (self.min_col..=self.max_col).contains(&col)
    }
}

/// Ordered stack of equally shaped color planes.
///
/// Shape is `(channels, rows, cols)`. NaN marks invalid or out-of-frame
/// pixels. The stack is never mutated after construction; every processing
/// stage returns a new stack.
#[derive(Clone, Debug)]
pub struct ColorPlaneStack {
    data: Array3<f32>,
    channels: Vec<Channel>,
}

impl ColorPlaneStack {
    pub fn new(data: Array3<f32>, channels: Vec<Channel>) -> Result<Self> {
        let (n, rows, cols) = data.dim();
        if n == 0 {
            return Err(SpectralError::Configuration(
                "stack must contain at least one channel".into(),
            ));
        }
        if rows == 0 || cols == 0 {
            return Err(SpectralError::Configuration(format!(
                "invalid plane dimensions: {rows}x{cols}"
            )));
        }
        if channels.len() != n {
            return Err(SpectralError::Configuration(format!(
                "{} channel labels for {n} planes",
                channels.len()
            )));
        }
        Ok(Self { data, channels })
    }

    /// Build a stack from separate planes, which must all share one shape.
    pub fn from_planes(planes: &[Array2<f32>], channels: Vec<Channel>) -> Result<Self> {
        if planes.is_empty() {
            return Err(SpectralError::Configuration(
                "stack must contain at least one channel".into(),
            ));
        }
        let shape = planes[0].dim();
        if let Some(bad) = planes.iter().find(|p| p.dim() != shape) {
            return Err(SpectralError::Configuration(format!(
                "plane shape {:?} differs from {:?}",
                bad.dim(),
                shape
            )));
        }
        let views: Vec<ArrayView2<f32>> = planes.iter().map(|p| p.view()).collect();
        let data = ndarray::stack(Axis(0), &views)
            .map_err(|e| SpectralError::Configuration(format!("cannot stack planes: {e}")))?;
        Self::new(data, channels)
    }

    /// Wrap an already-demosaiced single plane.
    pub fn mono(plane: Array2<f32>) -> Result<Self> {
        let data = plane.insert_axis(Axis(0));
        Self::new(data, vec![Channel(MONO_CHANNEL)])
    }

    /// Same channel labels, new pixel data of identical channel count.
    pub(crate) fn with_data(&self, data: Array3<f32>) -> Self {
        debug_assert_eq!(data.len_of(Axis(0)), self.channels.len());
        Self {
            data,
            channels: self.channels.clone(),
        }
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn cols(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Plane size as `(rows, cols)`.
    pub fn plane_dim(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn plane(&self, index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), index)
    }

    pub fn planes(&self) -> impl Iterator<Item = ArrayView2<'_, f32>> {
        self.data.outer_iter()
    }

    /// Index of the first plane labelled `channel`.
    pub fn channel_index(&self, channel: Channel) -> Option<usize> {
        self.channels.iter().position(|&c| c == channel)
    }

    /// Copy of the stack restricted to `roi` (inclusive bounds).
    pub fn crop(&self, roi: &Roi) -> Result<Self> {
        let (rows, cols) = self.plane_dim();
        if roi.min_row > roi.max_row
            || roi.min_col > roi.max_col
            || roi.max_row >= rows
            || roi.max_col >= cols
        {
            return Err(SpectralError::Configuration(format!(
                "ROI {roi:?} does not fit a {rows}x{cols} stack"
            )));
        }
        let data = self
            .data
            .slice(s![.., roi.min_row..=roi.max_row, roi.min_col..=roi.max_col])
            .to_owned();
        Ok(self.with_data(data))
    }

    /// Copy of the stack with each channel's background mean subtracted.
    pub fn subtract_background(&self, stats: &[BackgroundStats]) -> Result<Self> {
        if stats.len() != self.channel_count() {
            return Err(SpectralError::Configuration(format!(
                "{} background entries for {} channels",
                stats.len(),
                self.channel_count()
            )));
        }
        let mut data = self.data.clone();
        for (mut plane, st) in data.outer_iter_mut().zip(stats) {
            let mean = st.mean as f32;
            plane.mapv_inplace(|v| v - mean);
        }
        Ok(self.with_data(data))
    }

    /// Number of finite pixels per channel.
    pub fn finite_counts(&self) -> Vec<usize> {
        self.planes()
            .map(|p| p.iter().filter(|v| v.is_finite()).count())
            .collect()
    }
}
