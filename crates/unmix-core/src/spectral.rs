use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::consts::MICRONS_PER_CM;
use crate::error::{Result, UnmixError};

/// Raw multi-band intensities of a single plane.
/// Values are instrument counts, not normalised.
#[derive(Clone, Debug)]
pub struct BandStack {
    /// Intensity data, shape = (bands, width, height), indexed `[band, x, y]`.
    pub data: Array3<f32>,
    /// Bit depth of the source samples (8 or 16).
    pub bit_depth: u8,
}

impl BandStack {
    pub fn new(data: Array3<f32>, bit_depth: u8) -> Self {
        Self { data, bit_depth }
    }

    pub fn bands(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn layout(&self) -> PixelLayout {
        PixelLayout::new(self.width(), self.height())
    }
}

/// The flattening convention shared by vectorization and reassembly.
///
/// Pixel `(x, y)` maps to column `x * height + y`: row-major over the
/// `(width, height)` axes, so `y` varies fastest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelLayout {
    pub width: usize,
    pub height: usize,
}

impl PixelLayout {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        x * self.height + y
    }

    #[inline]
    pub fn coords(&self, pixel: usize) -> (usize, usize) {
        (pixel / self.height, pixel % self.height)
    }
}

/// Band-by-pixel matrix, shape = (bands, width * height).
pub type PixelMatrix = Array2<f64>;

/// Channel-by-pixel weights, shape = (channels, width * height).
pub type SolutionMatrix = Array2<f64>;

/// Expected per-band response of each fluorophore.
///
/// Rows are bands (matched to the band stack by position), columns are
/// channels. Labels are carried through untouched for channel selection.
#[derive(Clone, Debug)]
pub struct ReferenceMatrix {
    data: Array2<f64>,
    labels: Vec<String>,
}

impl ReferenceMatrix {
    pub fn new(data: Array2<f64>, labels: Vec<String>) -> Result<Self> {
        let (bands, channels) = data.dim();
        if bands == 0 || channels == 0 {
            return Err(UnmixError::InvalidReference(format!(
                "reference must have at least one band and one channel, got {bands}x{channels}"
            )));
        }
        if labels.len() != channels {
            return Err(UnmixError::InvalidReference(format!(
                "{} labels for {} channels",
                labels.len(),
                channels
            )));
        }
        if let Some(((band, channel), v)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(UnmixError::InvalidReference(format!(
                "non-finite value {v} at band {band}, channel {channel}"
            )));
        }
        Ok(Self { data, labels })
    }

    /// Reference with generated labels `ch0`, `ch1`, ...
    pub fn unlabeled(data: Array2<f64>) -> Result<Self> {
        let labels = (0..data.ncols()).map(|c| format!("ch{c}")).collect();
        Self::new(data, labels)
    }

    pub fn bands(&self) -> usize {
        self.data.nrows()
    }

    pub fn channels(&self) -> usize {
        self.data.ncols()
    }

    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn column(&self, channel: usize) -> ArrayView1<'_, f64> {
        self.data.column(channel)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Physical pixel size in micrometres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelScale {
    pub x_um: f64,
    pub y_um: f64,
}

impl PixelScale {
    /// Resolution as pixels per centimetre along (x, y).
    pub fn pixels_per_cm(&self) -> (f64, f64) {
        (MICRONS_PER_CM / self.x_um, MICRONS_PER_CM / self.y_um)
    }
}

/// Unmixed channels of one plane.
#[derive(Clone, Debug)]
pub struct OutputImage<T = u16> {
    /// Channel data, shape = (channels, width, height), indexed `[channel, x, y]`.
    pub data: Array3<T>,
    /// Label of each kept channel, in output order.
    pub labels: Vec<String>,
    pub scale: Option<PixelScale>,
}

impl<T> OutputImage<T> {
    pub fn channels(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// One channel as a `(width, height)` view.
    pub fn channel(&self, index: usize) -> ArrayView2<'_, T> {
        self.data.index_axis(Axis(0), index)
    }
}
