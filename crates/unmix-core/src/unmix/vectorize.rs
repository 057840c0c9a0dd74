use ndarray::{Array2, Array3, Axis};
use tracing::debug;

use crate::error::{Result, UnmixError};
use crate::filters::median::{median_filter_bands, median_filter_bands_serial};
use crate::spectral::{BandStack, PixelLayout, PixelMatrix};

use super::config::Smoothing;
use super::parallel::worker_pool;

/// Turn a band stack into a `(bands, width * height)` pixel matrix.
///
/// `expected_bands` is the reference row count; a stack with any other band
/// count is rejected before anything is allocated. Smoothing, when enabled,
/// runs on a copy in the global rayon pool; the stack itself is never modified.
pub fn vectorize(
    stack: &BandStack,
    expected_bands: usize,
    smoothing: &Smoothing,
) -> Result<PixelMatrix> {
    vectorize_on(stack, expected_bands, smoothing, None)
}

/// [`vectorize`] with smoothing bound to `workers` threads.
///
/// One worker filters every band on the calling thread; more run on a
/// dedicated pool of that size. The matrix is identical either way.
pub fn vectorize_with_workers(
    stack: &BandStack,
    expected_bands: usize,
    smoothing: &Smoothing,
    workers: usize,
) -> Result<PixelMatrix> {
    vectorize_on(stack, expected_bands, smoothing, Some(workers.max(1)))
}

fn vectorize_on(
    stack: &BandStack,
    expected_bands: usize,
    smoothing: &Smoothing,
    workers: Option<usize>,
) -> Result<PixelMatrix> {
    if stack.bands() != expected_bands {
        return Err(UnmixError::shape("band count", expected_bands, stack.bands()));
    }

    let layout = stack.layout();
    if !smoothing.enabled {
        return Ok(flatten(&stack.data, layout));
    }

    debug!(
        bands = stack.bands(),
        width = layout.width,
        height = layout.height,
        border = %smoothing.border,
        workers = ?workers,
        "Median filtering bands"
    );
    let smoothed = match workers {
        None => median_filter_bands(&stack.data, smoothing.border),
        Some(1) => median_filter_bands_serial(&stack.data, smoothing.border),
        Some(n) => {
            worker_pool(n)?.install(|| median_filter_bands(&stack.data, smoothing.border))
        }
    };
    Ok(flatten(&smoothed, layout))
}

/// Flatten `(bands, width, height)` data using `layout`'s pixel order.
pub fn flatten(data: &Array3<f32>, layout: PixelLayout) -> PixelMatrix {
    let bands = data.len_of(Axis(0));
    let mut pixels = Array2::<f64>::zeros((bands, layout.pixel_count()));
    for ((band, x, y), &v) in data.indexed_iter() {
        pixels[[band, layout.index(x, y)]] = v as f64;
    }
    pixels
}
