use ndarray::Array2;

use spectral_core::stack::{Channel, ColorPlaneStack};

/// Deterministic pseudo-noise in `[-0.5, 0.5)` for pixel `(row, col)`.
pub fn hash_noise(row: usize, col: usize) -> f64 {
    let v = ((row as f64) * 12.9898 + (col as f64) * 78.233).sin() * 43_758.545_3;
    v - v.floor() - 0.5
}

/// Square plane holding an elongated Gaussian ridge through the center.
///
/// The ridge's long axis points along `(cos theta, sin theta)` in
/// `(col, row)` coordinates.
pub fn ridge_plane(
    size: usize,
    theta_deg: f64,
    amplitude: f64,
    background: f64,
    noise: f64,
) -> Array2<f32> {
    let sigma_long = 25.0;
    let sigma_short = 3.0;
    let c = (size as f64 - 1.0) / 2.0;
    let (sin, cos) = theta_deg.to_radians().sin_cos();

    Array2::from_shape_fn((size, size), |(row, col)| {
        let dx = col as f64 - c;
        let dy = row as f64 - c;
        let u = dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        let g = (-0.5 * (u / sigma_long).powi(2)).exp() * (-0.5 * (v / sigma_short).powi(2)).exp();
        (background + amplitude * g + noise * hash_noise(row, col)) as f32
    })
}

/// Three-channel RGB stack of ridges sharing one orientation.
pub fn ridge_stack(size: usize, theta_deg: f64) -> ColorPlaneStack {
    let planes = [
        ridge_plane(size, theta_deg, 100.0, 10.0, 1.0),
        ridge_plane(size, theta_deg, 80.0, 12.0, 1.0),
        ridge_plane(size, theta_deg, 60.0, 8.0, 1.0),
    ];
    ColorPlaneStack::from_planes(&planes, Channel::parse_all("RGB")).expect("valid stack")
}

/// Interleave R, G and B planes into an RGGB mosaic (both greens identical).
pub fn rggb_mosaic(red: &Array2<f32>, green: &Array2<f32>, blue: &Array2<f32>) -> Array2<f32> {
    let (h, w) = red.dim();
    Array2::from_shape_fn((2 * h, 2 * w), |(row, col)| {
        let (r, c) = (row / 2, col / 2);
        match (row % 2, col % 2) {
            (0, 0) => red[[r, c]],
            (1, 1) => blue[[r, c]],
            _ => green[[r, c]],
        }
    })
}

/// Gaussian pulse of standard deviation `sigma` centered at `center`.
pub fn gaussian_pulse(len: usize, center: f64, sigma: f64, amplitude: f64) -> Vec<f64> {
    (0..len)
        .map(|i| amplitude * (-0.5 * ((i as f64 - center) / sigma).powi(2)).exp())
        .collect()
}

/// Separable plane: outer product of a row pulse and a column pulse.
pub fn pulse_plane(row_pulse: &[f64], col_pulse: &[f64]) -> Array2<f32> {
    Array2::from_shape_fn((row_pulse.len(), col_pulse.len()), |(r, c)| {
        (row_pulse[r] * col_pulse[c]) as f32
    })
}

/// Smallest angular distance between two orientations, modulo 180 degrees.
pub fn angle_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(180.0);
    d.min(180.0 - d)
}

/// Bitwise equality of two float slices, treating identical NaNs as equal.
pub fn bits_equal<'a>(a: impl IntoIterator<Item = &'a f32>, b: impl IntoIterator<Item = &'a f32>) -> bool {
    let a: Vec<u32> = a.into_iter().map(|v| v.to_bits()).collect();
    let b: Vec<u32> = b.into_iter().map(|v| v.to_bits()).collect();
    a == b
}
