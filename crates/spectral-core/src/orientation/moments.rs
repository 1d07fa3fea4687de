//! Raw image moments up to second order.

use ndarray::ArrayView2;

use crate::error::{Result, SpectralError};

use super::OrientationAngle;

/// Raw moments of a plane, with `x` the column and `y` the row index.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImageMoments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m11: f64,
    pub m20: f64,
    pub m02: f64,
}

impl ImageMoments {
    /// Accumulate moments over all finite pixels. NaN and infinities are
    /// treated as zero weight.
    pub fn calculate(data: ArrayView2<f32>) -> Self {
        let mut m = Self::default();

        for ((y, x), &value) in data.indexed_iter() {
            if !value.is_finite() {
                continue;
            }
            let p = value as f64;
            let x = x as f64;
            let y = y as f64;

            m.m00 += p;
            m.m10 += x * p;
            m.m01 += y * p;
            m.m11 += x * y * p;
            m.m20 += x * x * p;
            m.m02 += y * y * p;
        }

        m
    }

    fn check_mass(&self) -> Result<()> {
        if self.m00 == 0.0 || !self.m00.is_finite() {
            return Err(SpectralError::UndefinedMoment(format!(
                "zeroth moment is {} (no signal left after clipping?)",
                self.m00
            )));
        }
        Ok(())
    }

    /// Intensity-weighted centroid as `(row, col)`.
    pub fn centroid(&self) -> Result<(f64, f64)> {
        self.check_mass()?;
        Ok((self.m01 / self.m00, self.m10 / self.m00))
    }

    /// Normalized central second moments `(mu20, mu02, mu11)`.
    pub fn central(&self) -> Result<(f64, f64, f64)> {
        let (avg_y, avg_x) = self.centroid()?;
        let mu20 = self.m20 / self.m00 - avg_x * avg_x;
        let mu02 = self.m02 / self.m00 - avg_y * avg_y;
        let mu11 = self.m11 / self.m00 - avg_x * avg_y;
        Ok((mu20, mu02, mu11))
    }

    /// Angle of the principal axis.
    pub fn orientation(&self) -> Result<OrientationAngle> {
        let (mu20, mu02, mu11) = self.central()?;
        let theta = 0.5 * (2.0 * mu11).atan2(mu20 - mu02);
        Ok(OrientationAngle::from_radians(theta))
    }
}
