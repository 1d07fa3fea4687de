use ndarray::{s, Array2, ArrayView2};
use tracing::debug;

use crate::error::{Result, SpectralError};
use crate::stack::{Channel, ColorMode, ColorPlaneStack};

/// Periodic color-filter tile over a monochrome sensor.
///
/// Each tile cell holds an index into `channels`, the channel-order
/// descriptor reported by the raw loader. A Canon-style sensor reports
/// `RGBG` with tile `[[0, 1], [3, 2]]`: two distinct green cells that
/// fold into one logical `G` channel.
#[derive(Clone, Debug, PartialEq)]
pub struct CfaPattern {
    tile: Array2<usize>,
    channels: Vec<Channel>,
}

impl CfaPattern {
    pub fn new(tile: Array2<usize>, channels: Vec<Channel>) -> Result<Self> {
        let (th, tw) = tile.dim();
        if th == 0 || tw == 0 {
            return Err(SpectralError::Configuration("empty CFA tile".into()));
        }
        if let Some(&bad) = tile.iter().find(|&&idx| idx >= channels.len()) {
            return Err(SpectralError::Configuration(format!(
                "CFA tile index {bad} out of range for descriptor of length {}",
                channels.len()
            )));
        }
        if let Some(unused) = (0..channels.len()).find(|i| !tile.iter().any(|idx| idx == i)) {
            return Err(SpectralError::Configuration(format!(
                "descriptor entry {unused} ({}) is not used by the CFA tile",
                channels[unused]
            )));
        }
        Ok(Self { tile, channels })
    }

    /// Build a pattern from a descriptor string such as `"RGBG"`.
    pub fn parse(descriptor: &str, tile: Array2<usize>) -> Result<Self> {
        Self::new(tile, Channel::parse_all(descriptor))
    }

    /// Standard 2x2 Bayer layouts, described as `RGBG`.
    ///
    /// Returns `None` for non-Bayer modes.
    pub fn from_color_mode(mode: ColorMode) -> Option<Self> {
        let (red_row, red_col) = match mode {
            ColorMode::BayerRGGB => (0, 0),
            ColorMode::BayerGRBG => (0, 1),
            ColorMode::BayerGBRG => (1, 0),
            ColorMode::BayerBGGR => (1, 1),
            ColorMode::Mono => return None,
        };

        let mut tile = Array2::<usize>::zeros((2, 2));
        for row in 0..2 {
            for col in 0..2 {
                tile[[row, col]] = match (row == red_row, col == red_col) {
                    (true, true) => 0,
                    // Green on red row
                    (true, false) => 1,
                    (false, false) => 2,
                    // Green on blue row
                    (false, true) => 3,
                };
            }
        }

        Some(Self {
            tile,
            channels: Channel::parse_all("RGBG"),
        })
    }

    pub fn tile(&self) -> &Array2<usize> {
        &self.tile
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// `(tile_rows, tile_cols)`.
    pub fn tile_dim(&self) -> (usize, usize) {
        self.tile.dim()
    }

    /// Channel label at tile cell `(row, col)`.
    pub fn channel_at(&self, row: usize, col: usize) -> Channel {
        self.channels[self.tile[[row, col]]]
    }

    /// Distinct channel labels in first-appearance order of the descriptor.
    pub fn distinct_channels(&self) -> Vec<Channel> {
        let mut out: Vec<Channel> = Vec::new();
        for &c in &self.channels {
            if !out.contains(&c) {
                out.push(c);
            }
        }
        out
    }

    fn check_raw_dim(&self, raw: &Array2<f32>) -> Result<()> {
        let (h, w) = raw.dim();
        let (th, tw) = self.tile_dim();
        if h == 0 || w == 0 || h % th != 0 || w % tw != 0 {
            return Err(SpectralError::Configuration(format!(
                "raw dimensions {h}x{w} are not a multiple of the {th}x{tw} CFA tile"
            )));
        }
        Ok(())
    }

    /// Sub-sampled view of the raw grid holding only tile cell `(row, col)`.
    fn cell_view<'a>(&self, raw: &'a Array2<f32>, row: usize, col: usize) -> ArrayView2<'a, f32> {
        let (th, tw) = self.tile_dim();
        raw.slice(s![row..;th as isize, col..;tw as isize])
    }
}

/// Split a raw mosaic into one plane per tile cell, without folding.
///
/// Planes are in row-major tile order and labelled with each cell's channel,
/// so an RGGB sensor yields `R, G, G, B`.
pub fn split_cells(raw: &Array2<f32>, pattern: &CfaPattern) -> Result<ColorPlaneStack> {
    pattern.check_raw_dim(raw)?;
    let (th, tw) = pattern.tile_dim();

    let mut planes = Vec::with_capacity(th * tw);
    let mut labels = Vec::with_capacity(th * tw);
    for row in 0..th {
        for col in 0..tw {
            planes.push(pattern.cell_view(raw, row, col).to_owned());
            labels.push(pattern.channel_at(row, col));
        }
    }
    ColorPlaneStack::from_planes(&planes, labels)
}

/// Demosaic a raw mosaic into one plane per channel of `target` (e.g. `"RGB"`).
///
/// Output planes have shape `raw_shape / tile_shape`. Cells that map to the
/// same logical channel are averaged elementwise.
pub fn demosaic(raw: &Array2<f32>, pattern: &CfaPattern, target: &str) -> Result<ColorPlaneStack> {
    let target = Channel::parse_all(target);
    if target.is_empty() {
        return Err(SpectralError::Configuration(
            "target channel order is empty".into(),
        ));
    }
    for (i, c) in target.iter().enumerate() {
        if target[..i].contains(c) {
            return Err(SpectralError::Configuration(format!(
                "target channel {c} listed more than once"
            )));
        }
        if !pattern.channels().contains(c) {
            return Err(SpectralError::Configuration(format!(
                "target channel {c} is not part of the CFA descriptor"
            )));
        }
    }
    pattern.check_raw_dim(raw)?;

    let (h, w) = raw.dim();
    let (th, tw) = pattern.tile_dim();
    let out_dim = (h / th, w / tw);

    let mut planes = Vec::with_capacity(target.len());
    for &channel in &target {
        let mut sum = Array2::<f32>::zeros(out_dim);
        let mut count = 0usize;
        for row in 0..th {
            for col in 0..tw {
                if pattern.channel_at(row, col) == channel {
                    sum += &pattern.cell_view(raw, row, col);
                    count += 1;
                }
            }
        }
        if count > 1 {
            sum.mapv_inplace(|v| v / count as f32);
        }
        debug!(channel = %channel, cells = count, "Demosaiced channel");
        planes.push(sum);
    }

    ColorPlaneStack::from_planes(&planes, target)
}
