//! De-rotation of a color plane stack.
//!
//! Every channel is rotated about the plane center with the same bilinear
//! scheme. The output keeps the input shape; pixels whose source falls
//! outside the frame become NaN so later statistics skip them.

use ndarray::{Array2, Array3, ArrayView2};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::orientation::OrientationAngle;
use crate::stack::ColorPlaneStack;

/// Tolerance for source coordinates that land a rounding error outside the frame.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Rotate every channel so that content oriented at `angle` becomes horizontal.
pub fn rotate_stack(stack: &ColorPlaneStack, angle: OrientationAngle) -> ColorPlaneStack {
    if angle.degrees() == 0.0 {
        return stack.clone();
    }

    let (rows, cols) = stack.plane_dim();
    let n = stack.channel_count();
    let (sin, cos) = angle.radians().sin_cos();

    let planes: Vec<Array2<f32>> = if rows * cols >= PARALLEL_PIXEL_THRESHOLD {
        (0..n)
            .into_par_iter()
            .map(|idx| rotate_plane(stack.plane(idx), sin, cos))
            .collect()
    } else {
        (0..n)
            .map(|idx| rotate_plane(stack.plane(idx), sin, cos))
            .collect()
    };

    let mut data = Array3::<f32>::zeros((n, rows, cols));
    for (mut dst, plane) in data.outer_iter_mut().zip(&planes) {
        dst.assign(plane);
    }
    stack.with_data(data)
}

/// Rotate one plane. For each output pixel the source position is found by
/// rotating its offset from the center forward by the angle.
pub fn rotate_plane(plane: ArrayView2<f32>, sin: f64, cos: f64) -> Array2<f32> {
    let (h, w) = plane.dim();
    let cy = (h as f64 - 1.0) * 0.5;
    let cx = (w as f64 - 1.0) * 0.5;

    Array2::from_shape_fn((h, w), |(row, col)| {
        let dy = row as f64 - cy;
        let dx = col as f64 - cx;
        let src_x = cx + cos * dx - sin * dy;
        let src_y = cy + sin * dx + cos * dy;
        nan_bilinear_sample(plane, src_y, src_x)
    })
}

/// Bilinear sample that yields NaN outside `[0, h-1] x [0, w-1]`.
///
/// A NaN neighbour only contaminates the result when its weight is non-zero.
pub fn nan_bilinear_sample(data: ArrayView2<f32>, y: f64, x: f64) -> f32 {
    let (h, w) = data.dim();
    let max_y = h as f64 - 1.0;
    let max_x = w as f64 - 1.0;

    if !(y >= -EDGE_TOLERANCE
        && y <= max_y + EDGE_TOLERANCE
        && x >= -EDGE_TOLERANCE
        && x <= max_x + EDGE_TOLERANCE)
    {
        return f32::NAN;
    }

    let y = y.clamp(0.0, max_y);
    let x = x.clamp(0.0, max_x);

    let y0 = y.floor() as usize;
    let x0 = x.floor() as usize;
    let y1 = (y0 + 1).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);

    let fy = y - y0 as f64;
    let fx = x - x0 as f64;

    let taps = [
        (y0, x0, (1.0 - fx) * (1.0 - fy)),
        (y0, x1, fx * (1.0 - fy)),
        (y1, x0, (1.0 - fx) * fy),
        (y1, x1, fx * fy),
    ];

    let mut acc = 0.0f64;
    for (r, c, weight) in taps {
        if weight != 0.0 {
            acc += data[[r, c]] as f64 * weight;
        }
    }
    acc as f32
}
