use approx::assert_abs_diff_eq;
use ndarray::{array, Array2};

use spectral_core::profile::{
    column_profile, row_profile, slit_profile, spectrum_profiles, total_profile, Reduction,
};
use spectral_core::stack::{Channel, ColorPlaneStack};

fn rb_stack() -> ColorPlaneStack {
    let planes = [
        array![[1.0f32, 5.0, f32::NAN], [3.0, 1.0, f32::NAN]],
        array![[2.0f32, 2.0, 4.0], [f32::NAN, 6.0, 0.0]],
    ];
    ColorPlaneStack::from_planes(&planes, Channel::parse_all("RB")).unwrap()
}

#[test]
fn test_reduce_skips_non_finite() {
    let values = [1.0f32, f32::NAN, 3.0, f32::INFINITY];
    assert_eq!(Reduction::Max.reduce(values.iter()), 3.0);
    assert_eq!(Reduction::Mean.reduce(values.iter()), 2.0);

    let empty = [f32::NAN, f32::NAN];
    assert!(Reduction::Max.reduce(empty.iter()).is_nan());
    assert!(Reduction::Mean.reduce(empty.iter()).is_nan());
}

#[test]
fn test_column_profile() {
    let stack = rb_stack();
    let max = column_profile(stack.plane(0), Reduction::Max);
    assert_eq!(max[..2], [3.0, 5.0]);
    assert!(max[2].is_nan());

    let mean = column_profile(stack.plane(1), Reduction::Mean);
    assert_eq!(mean, vec![2.0, 4.0, 2.0]);
}

#[test]
fn test_row_profile_spans_channels() {
    let stack = rb_stack();
    assert_eq!(row_profile(&stack, Reduction::Max), vec![5.0, 6.0]);
    // Row 0: 1 + 5 + 2 + 2 + 4 over five finite pixels.
    let mean = row_profile(&stack, Reduction::Mean);
    assert_abs_diff_eq!(mean[0], 2.8, epsilon = 1e-12);
    assert_abs_diff_eq!(mean[1], 2.5, epsilon = 1e-12);
}

#[test]
fn test_slit_profile_is_row_maximum() {
    let stack = rb_stack();
    assert_eq!(slit_profile(&stack), row_profile(&stack, Reduction::Max));
}

#[test]
fn test_spectrum_and_total() {
    let stack = rb_stack();
    let spectra = spectrum_profiles(&stack, Reduction::Max);
    assert_eq!(spectra.len(), 2);
    assert_eq!(spectra[1], vec![2.0, 6.0, 4.0]);

    let total = total_profile(&spectra);
    assert_eq!(total[..2], [5.0, 11.0]);
    assert!(total[2].is_nan());
}

#[test]
fn test_total_of_nothing_is_empty() {
    assert!(total_profile(&[]).is_empty());
}

#[test]
fn test_profile_lengths_follow_axes() {
    let stack = ColorPlaneStack::mono(Array2::<f32>::ones((7, 13))).unwrap();
    assert_eq!(spectrum_profiles(&stack, Reduction::Mean)[0].len(), 13);
    assert_eq!(slit_profile(&stack).len(), 7);
}
