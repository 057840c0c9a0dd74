use ndarray::Array3;
use num_traits::{Bounded, NumCast, ToPrimitive, Zero};

use crate::error::{Result, UnmixError};
use crate::spectral::{OutputImage, PixelLayout, SolutionMatrix};

/// Rebuild a 16-bit `(channels, width, height)` image from solved weights.
///
/// `channel_order` picks and orders the output channels by reference column;
/// `None` keeps every channel in reference order. `labels` names the
/// reference columns and is carried through for the kept channels.
pub fn reassemble(
    solution: &SolutionMatrix,
    layout: PixelLayout,
    channel_order: Option<&[usize]>,
    labels: &[String],
) -> Result<OutputImage<u16>> {
    reassemble_as::<u16>(solution, layout, channel_order, labels)
}

/// Like [`reassemble`], for any non-negative integer sample type.
///
/// Weights are truncated toward zero and clamped to `T::max_value()`.
/// A negative or non-finite weight is a bug upstream and fails the call.
pub fn reassemble_as<T>(
    solution: &SolutionMatrix,
    layout: PixelLayout,
    channel_order: Option<&[usize]>,
    labels: &[String],
) -> Result<OutputImage<T>>
where
    T: NumCast + Bounded + Zero + Copy,
{
    let (channels, n) = solution.dim();
    if n != layout.pixel_count() {
        return Err(UnmixError::shape("solution columns", layout.pixel_count(), n));
    }
    if labels.len() != channels {
        return Err(UnmixError::shape("channel labels", channels, labels.len()));
    }

    if let Some(((channel, pixel), v)) = solution
        .indexed_iter()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        return Err(UnmixError::InvariantViolation(format!(
            "weight {v} for channel {channel} at pixel {pixel} reached reassembly"
        )));
    }

    let order: Vec<usize> = match channel_order {
        Some(order) => order.to_vec(),
        None => (0..channels).collect(),
    };
    if let Some(&index) = order.iter().find(|&&c| c >= channels) {
        return Err(UnmixError::ChannelOutOfRange { index, channels });
    }

    let max = T::max_value().to_f64().unwrap_or(f64::MAX);
    let mut data =
        Array3::<T>::from_elem((order.len(), layout.width, layout.height), T::zero());

    for (out_channel, &src_channel) in order.iter().enumerate() {
        for (pixel, &v) in solution.row(src_channel).iter().enumerate() {
            let (x, y) = layout.coords(pixel);
            let sample = <T as NumCast>::from(v.min(max).trunc()).ok_or_else(|| {
                UnmixError::InvariantViolation(format!("weight {v} does not fit output type"))
            })?;
            data[[out_channel, x, y]] = sample;
        }
    }

    Ok(OutputImage {
        data,
        labels: order.iter().map(|&c| labels[c].clone()).collect(),
        scale: None,
    })
}
