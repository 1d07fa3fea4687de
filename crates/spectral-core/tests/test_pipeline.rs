#[allow(dead_code)]
mod common;

use ndarray::Array2;

use spectral_core::color::{demosaic, CfaPattern};
use spectral_core::error::SpectralError;
use spectral_core::orientation::OrientationMethod;
use spectral_core::pipeline::{
    extract, extract_batch, extract_with_retry, Extraction, ExtractionConfig,
};
use spectral_core::stack::{Channel, ColorMode, ColorPlaneStack};

use common::{angle_distance, bits_equal, ridge_plane, ridge_stack, rggb_mosaic};

const SIZE: usize = 161;
const CENTER: usize = 80;

#[test]
fn test_mosaic_to_cropped_spectrum() {
    let theta = 10.0;
    let raw = rggb_mosaic(
        &ridge_plane(SIZE, theta, 100.0, 10.0, 1.0),
        &ridge_plane(SIZE, theta, 80.0, 12.0, 1.0),
        &ridge_plane(SIZE, theta, 60.0, 8.0, 1.0),
    );
    let pattern = CfaPattern::from_color_mode(ColorMode::BayerRGGB).unwrap();
    let stack = demosaic(&raw, &pattern, "RGB").unwrap();
    assert_eq!(stack.plane_dim(), (SIZE, SIZE));

    let result = extract(stack, &ExtractionConfig::default()).unwrap();

    assert!(angle_distance(result.angle.degrees(), theta) <= 2.0, "{}", result.angle);
    assert_eq!(result.per_channel_angles.len(), 3);
    assert_eq!(result.background.len(), 3);
    assert_eq!(result.derotated_background.len(), 3);

    let roi = result.roi;
    assert!(roi.contains(CENTER, CENTER), "{roi:?}");
    assert!(roi.max_row < SIZE && roi.max_col < SIZE);
    // The ridge is far narrower across than along.
    assert!(roi.rows() < roi.cols(), "{roi:?}");

    assert_eq!(result.stack.plane_dim(), (roi.rows(), roi.cols()));
    assert_eq!(result.stack.channels(), Channel::parse_all("RGB").as_slice());
}

#[test]
fn test_both_methods_run_end_to_end() {
    for method in [OrientationMethod::Moments, OrientationMethod::BinarizeSvd] {
        let config = ExtractionConfig {
            orientation: method,
            ..ExtractionConfig::default()
        };
        let result = extract(ridge_stack(SIZE, -35.0), &config).unwrap();
        assert!(
            angle_distance(result.angle.degrees(), -35.0) <= 2.0,
            "{method}: {}",
            result.angle
        );
    }
}

#[test]
fn test_extraction_is_deterministic() {
    let stack = ridge_stack(SIZE, 25.0);
    let config = ExtractionConfig::default();
    let a = extract(stack.clone(), &config).unwrap();
    let b = extract(stack, &config).unwrap();

    assert_eq!(a.angle, b.angle);
    assert_eq!(a.per_channel_angles, b.per_channel_angles);
    assert_eq!(a.background, b.background);
    assert_eq!(a.roi, b.roi);
    assert!(bits_equal(a.stack.data().iter(), b.stack.data().iter()));
}

#[test]
fn test_stages_are_memoized() {
    let extraction = Extraction::new(ridge_stack(SIZE, 15.0), ExtractionConfig::default()).unwrap();

    let first = extraction.derotated().unwrap();
    let second = extraction.derotated().unwrap();
    assert!(std::ptr::eq(first, second));

    let first = extraction.background().unwrap();
    let second = extraction.background().unwrap();
    assert!(std::ptr::eq(first, second));

    assert_eq!(extraction.roi().unwrap(), extraction.roi().unwrap());
    assert!(std::ptr::eq(
        extraction.cropped().unwrap(),
        extraction.cropped().unwrap()
    ));
}

#[test]
fn test_stage_accessors_agree_with_run() {
    let extraction = Extraction::new(ridge_stack(SIZE, -20.0), ExtractionConfig::default()).unwrap();
    let orientation = extraction.orientation().unwrap().clone();
    let result = extraction.run().unwrap();
    assert_eq!(result.angle, orientation.angle);
    assert_eq!(result.roi, extraction.roi().unwrap());

    // The clipped stack keeps only pixels well above the background.
    let clipped = extraction.clipped().unwrap();
    let kept: usize = clipped.finite_counts().iter().sum();
    assert!(kept > 0 && kept < 3 * SIZE * SIZE / 4);
}

#[test]
fn test_invalid_config_is_rejected() {
    let bad = [
        ExtractionConfig {
            clipping_factor: 0.0,
            ..ExtractionConfig::default()
        },
        ExtractionConfig {
            max_iterations: 0,
            ..ExtractionConfig::default()
        },
        ExtractionConfig {
            angle_tolerance_deg: f64::NAN,
            ..ExtractionConfig::default()
        },
    ];
    for config in bad {
        let err = Extraction::new(ridge_stack(16, 0.0), config).unwrap_err();
        assert!(matches!(err, SpectralError::Configuration(_)));
    }
}

// ---------------------------------------------------------------------------
// Retry and batch
// ---------------------------------------------------------------------------

#[test]
fn test_retry_lowers_clipping_factor() {
    let stack = ridge_stack(SIZE, 20.0);
    let config = ExtractionConfig {
        clipping_factor: 1e6,
        ..ExtractionConfig::default()
    };

    // Nothing survives such a high cut.
    let err = extract(stack.clone(), &config).unwrap_err();
    assert!(matches!(err, SpectralError::UndefinedMoment(_)));

    let result = extract_with_retry(&stack, &config).unwrap();
    assert!(angle_distance(result.angle.degrees(), 20.0) <= 2.0);
}

#[test]
fn test_retry_does_not_mask_degenerate_input() {
    let stack = ColorPlaneStack::mono(Array2::from_elem((32, 32), f32::NAN)).unwrap();
    let err = extract_with_retry(&stack, &ExtractionConfig::default()).unwrap_err();
    assert!(matches!(err, SpectralError::DegenerateStatistics { .. }));
}

#[test]
fn test_batch_keeps_order_and_isolates_failures() {
    let stacks = vec![
        ridge_stack(SIZE, 10.0),
        ColorPlaneStack::mono(Array2::from_elem((SIZE, SIZE), f32::NAN)).unwrap(),
        ridge_stack(SIZE, -30.0),
    ];
    let results = extract_batch(&stacks, &ExtractionConfig::default());
    assert_eq!(results.len(), 3);

    let first = results[0].as_ref().unwrap();
    assert!(angle_distance(first.angle.degrees(), 10.0) <= 2.0);
    assert!(results[1].is_err());
    let third = results[2].as_ref().unwrap();
    assert!(angle_distance(third.angle.degrees(), -30.0) <= 2.0);
}

#[test]
fn test_result_serializes_without_pixels() {
    let result = extract(ridge_stack(SIZE, 5.0), &ExtractionConfig::default()).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("angle").is_some());
    assert!(json.get("roi").is_some());
    assert!(json.get("stack").is_none());
    assert_eq!(json["background"].as_array().unwrap().len(), 3);
}
