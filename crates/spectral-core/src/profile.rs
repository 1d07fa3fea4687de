//! One-dimensional profiles of a stack: spectra along the dispersion axis
//! and the slit profile across it. Non-finite pixels are always skipped; a
//! profile entry with no finite pixels is NaN.

use std::fmt;

use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::stack::ColorPlaneStack;

/// How pixels are combined when collapsing an axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reduction {
    #[default]
    Max,
    Mean,
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Max => write!(f, "Max"),
            Self::Mean => write!(f, "Mean"),
        }
    }
}

impl Reduction {
    /// Reduce the finite values of `values`, NaN if there are none.
    pub fn reduce<'a>(self, values: impl IntoIterator<Item = &'a f32>) -> f64 {
        let mut count = 0usize;
        let mut acc = match self {
            Self::Max => f64::NEG_INFINITY,
            Self::Mean => 0.0,
        };
        for &v in values {
            if !v.is_finite() {
                continue;
            }
            count += 1;
            match self {
                Self::Max => acc = acc.max(v as f64),
                Self::Mean => acc += v as f64,
            }
        }
        match (count, self) {
            (0, _) => f64::NAN,
            (_, Self::Max) => acc,
            (n, Self::Mean) => acc / n as f64,
        }
    }
}

/// Collapse a plane over its rows: one value per column.
pub fn column_profile(plane: ArrayView2<f32>, reduction: Reduction) -> Vec<f64> {
    plane
        .axis_iter(Axis(1))
        .map(|column| reduction.reduce(column.iter()))
        .collect()
}

/// Collapse a stack over channels and columns: one value per row.
pub fn row_profile(stack: &ColorPlaneStack, reduction: Reduction) -> Vec<f64> {
    stack
        .data()
        .axis_iter(Axis(1))
        .map(|row_slab| reduction.reduce(row_slab.iter()))
        .collect()
}

/// Per-channel spectrum along the dispersion (column) axis.
pub fn spectrum_profiles(stack: &ColorPlaneStack, reduction: Reduction) -> Vec<Vec<f64>> {
    stack
        .planes()
        .map(|plane| column_profile(plane, reduction))
        .collect()
}

/// Elementwise sum of channel profiles. NaN in any channel propagates.
pub fn total_profile(profiles: &[Vec<f64>]) -> Vec<f64> {
    let len = profiles.iter().map(Vec::len).max().unwrap_or(0);
    (0..len)
        .map(|i| {
            profiles
                .iter()
                .map(|p| p.get(i).copied().unwrap_or(f64::NAN))
                .sum()
        })
        .collect()
}

/// Brightest pixel of each row over all channels and columns.
pub fn slit_profile(stack: &ColorPlaneStack) -> Vec<f64> {
    row_profile(stack, Reduction::Max)
}
