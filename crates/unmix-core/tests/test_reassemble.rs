mod common;

use ndarray::{arr2, Array2, Array3, Axis};

use unmix_core::error::UnmixError;
use unmix_core::spectral::{BandStack, PixelLayout};
use unmix_core::unmix::{reassemble, reassemble_as, unmix, vectorize, Smoothing, UnmixConfig};

use common::make_identity_reference;

fn labels(n: usize) -> Vec<String> {
    (0..n).map(|c| format!("ch{c}")).collect()
}

/// Solution whose value encodes channel and pixel: `c * 1000 + pixel`.
fn make_solution(channels: usize, layout: PixelLayout) -> Array2<f64> {
    Array2::from_shape_fn((channels, layout.pixel_count()), |(c, p)| {
        (c * 1000 + p) as f64
    })
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn test_identity_round_trip_reproduces_input() {
    let reference = make_identity_reference(3);
    let data = Array3::from_shape_fn((3, 5, 4), |(b, x, y)| (b * 1000 + x * 37 + y * 5) as f32);
    let stack = BandStack::new(data.clone(), 16);
    let layout = stack.layout();

    let pixels = vectorize(&stack, 3, &Smoothing::disabled()).unwrap();
    let solved = unmix(&reference, &pixels, layout, &UnmixConfig::serial()).unwrap();
    let output = reassemble(&solved.solution, layout, None, reference.labels()).unwrap();

    assert_eq!(output.data.dim(), (3, 5, 4));
    for ((c, x, y), &v) in output.data.indexed_iter() {
        assert_eq!(v as f32, data[[c, x, y]]);
    }
    assert_eq!(output.labels, labels(3));
}

#[test]
fn test_pixel_lands_at_its_coordinates() {
    let layout = PixelLayout::new(4, 3);
    let solution = make_solution(1, layout);
    let output = reassemble(&solution, layout, None, &labels(1)).unwrap();
    for x in 0..4 {
        for y in 0..3 {
            assert_eq!(output.data[[0, x, y]] as usize, layout.index(x, y));
        }
    }
}

// ---------------------------------------------------------------------------
// Channel order
// ---------------------------------------------------------------------------

#[test]
fn test_channel_order_selects_and_reorders() {
    let layout = PixelLayout::new(3, 2);
    let solution = make_solution(4, layout);
    let output = reassemble(&solution, layout, Some(&[2, 0]), &labels(4)).unwrap();

    assert_eq!(output.channels(), 2);
    assert_eq!(output.labels, vec!["ch2".to_string(), "ch0".to_string()]);
    assert_eq!(output.data[[0, 1, 1]] as usize, 2000 + layout.index(1, 1));
    assert_eq!(output.data[[1, 2, 0]] as usize, layout.index(2, 0));
}

#[test]
fn test_channel_order_out_of_range() {
    let layout = PixelLayout::new(3, 2);
    let solution = make_solution(4, layout);
    let err = reassemble(&solution, layout, Some(&[0, 4]), &labels(4)).unwrap_err();
    assert!(matches!(
        err,
        UnmixError::ChannelOutOfRange {
            index: 4,
            channels: 4
        }
    ));
}

#[test]
fn test_empty_channel_order() {
    let layout = PixelLayout::new(3, 2);
    let solution = make_solution(2, layout);
    let output = reassemble(&solution, layout, Some(&[]), &labels(2)).unwrap();
    assert_eq!(output.channels(), 0);
    assert!(output.labels.is_empty());
}

// ---------------------------------------------------------------------------
// Invalid weights and shapes
// ---------------------------------------------------------------------------

#[test]
fn test_negative_weight_is_invariant_violation() {
    let layout = PixelLayout::new(2, 2);
    let mut solution = make_solution(2, layout);
    solution[[1, 3]] = -0.5;
    let err = reassemble(&solution, layout, None, &labels(2)).unwrap_err();
    assert!(err.is_invariant_violation());
}

#[test]
fn test_nan_weight_is_invariant_violation() {
    let layout = PixelLayout::new(2, 2);
    let mut solution = make_solution(2, layout);
    solution[[0, 0]] = f64::NAN;
    let err = reassemble(&solution, layout, Some(&[1]), &labels(2)).unwrap_err();
    assert!(matches!(err, UnmixError::InvariantViolation(_)));
}

#[test]
fn test_solution_width_mismatch() {
    let solution = make_solution(2, PixelLayout::new(2, 2));
    let err = reassemble(&solution, PixelLayout::new(3, 2), None, &labels(2)).unwrap_err();
    assert!(matches!(err, UnmixError::ShapeMismatch { .. }));
}

#[test]
fn test_label_count_mismatch() {
    let layout = PixelLayout::new(2, 2);
    let solution = make_solution(2, layout);
    let err = reassemble(&solution, layout, None, &labels(3)).unwrap_err();
    assert!(matches!(err, UnmixError::ShapeMismatch { .. }));
}

// ---------------------------------------------------------------------------
// Casting
// ---------------------------------------------------------------------------

#[test]
fn test_u16_truncates_and_clamps() {
    let layout = PixelLayout::new(1, 3);
    let solution = arr2(&[[12.9, 65535.4, 70000.0]]);
    let output = reassemble(&solution, layout, None, &labels(1)).unwrap();
    let channel = output.channel(0);
    assert_eq!(channel[[0, 0]], 12);
    assert_eq!(channel[[0, 1]], 65535);
    assert_eq!(channel[[0, 2]], u16::MAX);
}

#[test]
fn test_u8_output_clamps_to_255() {
    let layout = PixelLayout::new(2, 1);
    let solution = arr2(&[[300.7, 254.99]]);
    let output = reassemble_as::<u8>(&solution, layout, None, &labels(1)).unwrap();
    assert_eq!(output.data.index_axis(Axis(0), 0)[[0, 0]], 255);
    assert_eq!(output.data.index_axis(Axis(0), 0)[[1, 0]], 254);
}

#[test]
fn test_scale_left_unset() {
    let layout = PixelLayout::new(2, 2);
    let output = reassemble(&make_solution(1, layout), layout, None, &labels(1)).unwrap();
    assert!(output.scale.is_none());
}
