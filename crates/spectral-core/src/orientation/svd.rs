use nalgebra::Matrix2;
use ndarray::ArrayView2;

use crate::error::{Result, SpectralError};

use super::OrientationAngle;

/// Orientation from the principal direction of a binarized plane.
///
/// Pixels at or above the mean of the finite pixels form the foreground.
/// Their `(row, col)` coordinates are mean-centered and the first right
/// singular vector gives the principal direction. The right singular vectors
/// of the centered `n x 2` coordinate matrix are those of its 2x2 scatter
/// matrix, so the SVD runs on the latter.
pub fn binarized_svd_angle(plane: ArrayView2<f32>) -> Result<OrientationAngle> {
    let (sum, count) = plane
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0f64, 0usize), |(s, n), &v| (s + v as f64, n + 1));
    if count == 0 {
        return Err(SpectralError::UndefinedMoment(
            "plane mean is undefined: no finite pixels".into(),
        ));
    }
    let mean = sum / count as f64;

    let coords: Vec<(f64, f64)> = plane
        .indexed_iter()
        .filter(|(_, v)| v.is_finite() && **v as f64 >= mean)
        .map(|((row, col), _)| (row as f64, col as f64))
        .collect();
    if coords.len() < 2 {
        return Err(SpectralError::UndefinedMoment(format!(
            "{} foreground pixel(s), need at least 2",
            coords.len()
        )));
    }

    let n = coords.len() as f64;
    let (sum_r, sum_c) = coords
        .iter()
        .fold((0.0, 0.0), |(ar, ac), &(r, c)| (ar + r, ac + c));
    let (mean_r, mean_c) = (sum_r / n, sum_c / n);

    let mut scatter = Matrix2::<f64>::zeros();
    for &(r, c) in &coords {
        let dr = r - mean_r;
        let dc = c - mean_c;
        scatter[(0, 0)] += dr * dr;
        scatter[(0, 1)] += dr * dc;
        scatter[(1, 1)] += dc * dc;
    }
    scatter[(1, 0)] = scatter[(0, 1)];

    let svd = scatter.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| SpectralError::UndefinedMoment("SVD did not converge".into()))?;

    let major = if svd.singular_values[0] >= svd.singular_values[1] {
        0
    } else {
        1
    };
    let v_row = v_t[(major, 0)];
    let v_col = v_t[(major, 1)];

    Ok(OrientationAngle::from_radians(v_row.atan2(v_col)))
}
