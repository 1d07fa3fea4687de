#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use spectral_core::background::{
    clip_background, estimate_background, sigma_clipped_stats, BackgroundStats, SigmaClip,
};
use spectral_core::error::SpectralError;
use spectral_core::stack::{Channel, ColorPlaneStack};

fn symmetric(sigma: f64) -> SigmaClip {
    SigmaClip::Symmetric { sigma }
}

/// Constant plane with a `rows x cols` block of hot pixels in one corner.
fn clustered_outliers(background: f32, rows: usize, cols: usize) -> Array2<f32> {
    let mut plane = Array2::from_elem((100, 100), background);
    plane
        .slice_mut(ndarray::s![..rows, ..cols])
        .fill(background + 1000.0);
    plane
}

/// Constant plane with exactly `outliers` scattered hot pixels.
fn scattered_outliers(background: f32, outliers: usize) -> Array2<f32> {
    let mut plane = Array2::from_elem((100, 100), background);
    let step = 10_000 / outliers.max(1);
    for k in 0..outliers {
        let i = k * step;
        plane[[i / 100, i % 100]] = background + 1000.0;
    }
    plane
}

// ---------------------------------------------------------------------------
// Robustness
// ---------------------------------------------------------------------------

#[test]
fn test_constant_background_with_outliers() {
    for outliers in [1, 50, 100, 250, 400, 499] {
        let stack = ColorPlaneStack::mono(scattered_outliers(100.0, outliers)).unwrap();
        let stats = estimate_background(&stack, &symmetric(3.0), 10).unwrap();

        assert_eq!(stats.len(), 1);
        assert_abs_diff_eq!(stats[0].mean, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stats[0].median, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stats[0].stddev, 0.0, epsilon = 1e-9);
        assert_eq!(stats[0].retained, 10_000 - outliers, "outliers = {outliers}");
    }
}

#[test]
fn test_clustered_outliers_are_rejected() {
    let plane = clustered_outliers(42.0, 5, 60);
    let hot = plane.iter().filter(|&&v| v > 500.0).count();
    assert_eq!(hot, 300);

    let stack = ColorPlaneStack::mono(plane).unwrap();
    let stats = estimate_background(&stack, &symmetric(3.0), 10).unwrap();
    assert_abs_diff_eq!(stats[0].mean, 42.0, epsilon = 1e-9);
    assert_abs_diff_eq!(stats[0].stddev, 0.0, epsilon = 1e-9);
}

#[test]
fn test_noisy_background_stats() {
    let plane = Array2::from_shape_fn((128, 128), |(r, c)| {
        (500.0 + 10.0 * common::hash_noise(r, c)) as f32
    });
    let stack = ColorPlaneStack::mono(plane).unwrap();
    let stats = estimate_background(&stack, &symmetric(3.0), 10).unwrap();

    // Uniform noise of width 10 has stddev 10 / sqrt(12).
    assert_abs_diff_eq!(stats[0].mean, 500.0, epsilon = 0.3);
    assert_abs_diff_eq!(stats[0].stddev, 10.0 / 12f64.sqrt(), epsilon = 0.15);
    assert!(stats[0].stddev >= 0.0);
}

#[test]
fn test_channels_are_independent() {
    let planes = [
        Array2::from_elem((32, 32), 10.0f32),
        Array2::from_elem((32, 32), 20.0f32),
        Array2::from_elem((32, 32), 30.0f32),
    ];
    let stack = ColorPlaneStack::from_planes(&planes, Channel::parse_all("RGB")).unwrap();
    let stats = estimate_background(&stack, &symmetric(3.0), 10).unwrap();
    let means: Vec<f64> = stats.iter().map(|s| s.mean).collect();
    assert_eq!(means, vec![10.0, 20.0, 30.0]);
}

#[test]
fn test_nan_pixels_are_ignored() {
    let mut plane = Array2::from_elem((20, 20), 7.0f32);
    plane[[0, 0]] = f32::NAN;
    plane[[5, 5]] = f32::INFINITY;
    let stack = ColorPlaneStack::mono(plane).unwrap();
    let stats = estimate_background(&stack, &symmetric(3.0), 10).unwrap();
    assert_eq!(stats[0].mean, 7.0);
    assert_eq!(stats[0].retained, 398);
}

#[test]
fn test_large_stack_uses_parallel_path() {
    // 300x300 exceeds the parallel threshold; results must match per channel.
    let planes = [
        Array2::from_elem((300, 300), 1.0f32),
        Array2::from_elem((300, 300), 2.0f32),
    ];
    let stack = ColorPlaneStack::from_planes(&planes, Channel::parse_all("RB")).unwrap();
    let stats = estimate_background(&stack, &symmetric(3.0), 10).unwrap();
    assert_eq!(stats[0].mean, 1.0);
    assert_eq!(stats[1].mean, 2.0);
}

// ---------------------------------------------------------------------------
// Clipping strategies and iteration cap
// ---------------------------------------------------------------------------

#[test]
fn test_asymmetric_clip_keeps_dark_pixels() {
    let mut values: Vec<f64> = (0..1000).map(|i| 100.0 + (i % 5) as f64).collect();
    values.extend([0.0; 5]);

    let one_sided = SigmaClip::Asymmetric {
        lower: 1000.0,
        upper: 3.0,
    };
    let kept_dark = sigma_clipped_stats(values.clone(), &one_sided, 10).unwrap();
    let two_sided = sigma_clipped_stats(values, &symmetric(3.0), 10).unwrap();

    assert_eq!(kept_dark.retained, 1005);
    assert_eq!(two_sided.retained, 1000);
    assert!(kept_dark.mean < two_sided.mean);
}

#[test]
fn test_iteration_cap_is_respected() {
    // A geometric ladder sheds one value per pass for a long time.
    let values: Vec<f64> = (0..60).map(|i| 1.5f64.powi(i)).collect();
    let stats = sigma_clipped_stats(values, &symmetric(1.0), 3).unwrap();
    assert!(stats.iterations <= 3);
}

#[test]
fn test_median_of_even_count() {
    let stats = sigma_clipped_stats(vec![1.0, 2.0, 3.0, 4.0], &symmetric(10.0), 10).unwrap();
    assert_abs_diff_eq!(stats.median, 2.5);
    assert_abs_diff_eq!(stats.mean, 2.5);
}

// ---------------------------------------------------------------------------
// Failure boundary
// ---------------------------------------------------------------------------

#[test]
fn test_all_nan_channel_is_degenerate() {
    let planes = [
        Array2::from_elem((16, 16), 5.0f32),
        Array2::from_elem((16, 16), f32::NAN),
    ];
    let stack = ColorPlaneStack::from_planes(&planes, Channel::parse_all("RG")).unwrap();
    let err = estimate_background(&stack, &symmetric(3.0), 10).unwrap_err();
    match err {
        SpectralError::DegenerateStatistics { channel, .. } => assert_eq!(channel, 1),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_invalid_sigma_is_configuration_error() {
    let stack = ColorPlaneStack::mono(Array2::from_elem((4, 4), 1.0f32)).unwrap();
    for clip in [symmetric(0.0), symmetric(-1.0), symmetric(f64::NAN)] {
        let err = estimate_background(&stack, &clip, 10).unwrap_err();
        assert!(matches!(err, SpectralError::Configuration(_)));
    }
    assert!(estimate_background(&stack, &symmetric(3.0), 0).is_err());
}

// ---------------------------------------------------------------------------
// Background clipper
// ---------------------------------------------------------------------------

fn stats(mean: f64, stddev: f64) -> BackgroundStats {
    BackgroundStats {
        mean,
        median: mean,
        stddev,
        retained: 0,
        iterations: 1,
    }
}

#[test]
fn test_clip_masks_below_threshold() {
    let plane = Array2::from_shape_vec((1, 5), vec![10.0, 19.0, 20.0, 50.0, f32::INFINITY]).unwrap();
    let stack = ColorPlaneStack::mono(plane).unwrap();

    // threshold = 10 + 5 * 2 = 20
    let clipped = clip_background(&stack, &[stats(10.0, 2.0)], 5.0).unwrap();
    let row: Vec<f32> = clipped.plane(0).iter().copied().collect();

    assert!(row[0].is_nan());
    assert!(row[1].is_nan());
    assert_eq!(row[2], 20.0);
    assert_eq!(row[3], 50.0);
    assert!(row[4].is_nan());
}

#[test]
fn test_clip_does_not_mutate_input() {
    let plane = Array2::from_elem((8, 8), 1.0f32);
    let stack = ColorPlaneStack::mono(plane.clone()).unwrap();
    let clipped = clip_background(&stack, &[stats(1.0, 1.0)], 10.0).unwrap();

    assert!(clipped.plane(0).iter().all(|v| v.is_nan()));
    assert_eq!(stack.plane(0), plane.view());
}

#[test]
fn test_clip_uses_per_channel_threshold() {
    let planes = [
        Array2::from_elem((4, 4), 15.0f32),
        Array2::from_elem((4, 4), 15.0f32),
    ];
    let stack = ColorPlaneStack::from_planes(&planes, Channel::parse_all("RB")).unwrap();
    let clipped = clip_background(&stack, &[stats(10.0, 1.0), stats(10.0, 0.1)], 10.0).unwrap();

    assert!(clipped.plane(0).iter().all(|v| v.is_nan()));
    assert!(clipped.plane(1).iter().all(|&v| v == 15.0));
}

#[test]
fn test_clip_rejects_bad_factor() {
    let stack = ColorPlaneStack::mono(Array2::from_elem((4, 4), 1.0f32)).unwrap();
    assert!(clip_background(&stack, &[stats(0.0, 1.0)], 0.0).is_err());
    assert!(clip_background(&stack, &[stats(0.0, 1.0), stats(0.0, 1.0)], 1.0).is_err());
}
