use std::fmt;

use ndarray::{Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::MEDIAN_KERNEL_SIZE;

const RADIUS: isize = (MEDIAN_KERNEL_SIZE / 2) as isize;
const WINDOW: usize = MEDIAN_KERNEL_SIZE * MEDIAN_KERNEL_SIZE;

/// How the median window samples outside the plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MedianBorder {
    /// Out-of-bounds samples read as zero.
    #[default]
    Zero,
    /// Out-of-bounds samples read the nearest edge pixel.
    Replicate,
}

impl fmt::Display for MedianBorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "Zero"),
            Self::Replicate => write!(f, "Replicate"),
        }
    }
}

/// 3x3 median of a single `(width, height)` plane.
pub fn median_filter_plane(plane: ArrayView2<f32>, border: MedianBorder) -> Array2<f32> {
    let (w, h) = plane.dim();
    let mut result = Array2::<f32>::zeros((w, h));
    let mut window = [0.0f32; WINDOW];

    for x in 0..w {
        for y in 0..h {
            let mut n = 0;
            for dx in -RADIUS..=RADIUS {
                for dy in -RADIUS..=RADIUS {
                    window[n] = sample(&plane, x as isize + dx, y as isize + dy, border);
                    n += 1;
                }
            }
            result[[x, y]] = *window
                .select_nth_unstable_by(WINDOW / 2, |a, b| a.total_cmp(b))
                .1;
        }
    }

    result
}

/// Median-filter every band of a `(bands, width, height)` stack independently.
///
/// Bands never mix; each one is filtered on its own task in the current
/// rayon pool.
pub fn median_filter_bands(data: &Array3<f32>, border: MedianBorder) -> Array3<f32> {
    let bands = data.len_of(Axis(0));
    let planes: Vec<Array2<f32>> = (0..bands)
        .into_par_iter()
        .map(|band| median_filter_plane(data.index_axis(Axis(0), band), border))
        .collect();
    stack_planes(data, planes)
}

/// Same output as [`median_filter_bands`], filtered band by band on the
/// calling thread.
pub fn median_filter_bands_serial(data: &Array3<f32>, border: MedianBorder) -> Array3<f32> {
    let planes: Vec<Array2<f32>> = data
        .axis_iter(Axis(0))
        .map(|band| median_filter_plane(band, border))
        .collect();
    stack_planes(data, planes)
}

fn stack_planes(data: &Array3<f32>, planes: Vec<Array2<f32>>) -> Array3<f32> {
    let mut result = Array3::<f32>::zeros(data.raw_dim());
    for (band, plane) in planes.into_iter().enumerate() {
        result.index_axis_mut(Axis(0), band).assign(&plane);
    }
    result
}

fn sample(plane: &ArrayView2<f32>, x: isize, y: isize, border: MedianBorder) -> f32 {
    let (w, h) = plane.dim();
    match border {
        MedianBorder::Zero => {
            if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
                0.0
            } else {
                plane[[x as usize, y as usize]]
            }
        }
        MedianBorder::Replicate => {
            let cx = x.clamp(0, w as isize - 1) as usize;
            let cy = y.clamp(0, h as isize - 1) as usize;
            plane[[cx, cy]]
        }
    }
}
