use std::path::{Path, PathBuf};

use image::{ImageBuffer, Luma};
use ndarray::Array3;
use tracing::debug;

use crate::consts::OUTPUT_SUFFIX;
use crate::error::{Result, UnmixError};
use crate::spectral::{BandStack, OutputImage, PixelScale};

use super::acquisition::AcquisitionInfo;
use super::ImageSource;

/// Single-plane band stack assembled from one grayscale TIFF per band.
pub struct TiffBandSource {
    stack: BandStack,
    info: AcquisitionInfo,
}

impl TiffBandSource {
    /// Load `paths` as bands 0..n, in the given order.
    pub fn open(paths: &[PathBuf], lasers: Vec<u32>, scale: Option<PixelScale>) -> Result<Self> {
        let Some(first) = paths.first() else {
            return Err(UnmixError::InvalidSource("no band images given".into()));
        };
        let (w, h) = image::image_dimensions(first)?;
        let (w, h) = (w as usize, h as usize);
        let mut data = Array3::<f32>::zeros((paths.len(), w, h));

        for (band, path) in paths.iter().enumerate() {
            let gray = image::open(path)?.to_luma16();
            let (bw, bh) = gray.dimensions();
            if bw as usize != w {
                return Err(UnmixError::shape("band image width", w, bw as usize));
            }
            if bh as usize != h {
                return Err(UnmixError::shape("band image height", h, bh as usize));
            }
            for (x, y, pixel) in gray.enumerate_pixels() {
                data[[band, x as usize, y as usize]] = pixel.0[0] as f32;
            }
        }
        debug!(bands = paths.len(), width = w, height = h, "Loaded band TIFFs");

        let info = AcquisitionInfo {
            bands: paths.len(),
            width: w,
            height: h,
            planes: 1,
            bit_depth: 16,
            lasers,
            scale,
        };
        Ok(Self {
            stack: BandStack::new(data, 16),
            info,
        })
    }
}

impl ImageSource for TiffBandSource {
    fn info(&self) -> &AcquisitionInfo {
        &self.info
    }

    fn read_plane(&self, plane: usize) -> Result<BandStack> {
        if plane != 0 {
            return Err(UnmixError::PlaneOutOfRange {
                index: plane,
                total: 1,
            });
        }
        Ok(self.stack.clone())
    }
}

/// File name for one output channel of one plane.
pub fn channel_file_name(stem: &str, plane: usize, label: &str) -> String {
    let label: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{stem}{OUTPUT_SUFFIX}-z{plane:02}-{label}.tif")
}

/// Write each channel of `output` as a 16-bit grayscale TIFF in `dir`.
pub fn write_output(
    output: &OutputImage<u16>,
    dir: &Path,
    stem: &str,
    plane: usize,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let (w, h) = (output.width(), output.height());
    let mut written = Vec::with_capacity(output.channels());

    for (index, label) in output.labels.iter().enumerate() {
        let channel = output.channel(index);
        let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_fn(w as u32, h as u32, |x, y| {
            Luma([channel[[x as usize, y as usize]]])
        });
        let path = dir.join(channel_file_name(stem, plane, label));
        img.save(&path)?;
        written.push(path);
    }

    Ok(written)
}

/// Load a 16-bit grayscale TIFF channel back as a `(width, height)` array.
pub fn read_channel(path: &Path) -> Result<ndarray::Array2<u16>> {
    let gray = image::open(path)?.to_luma16();
    let (w, h) = gray.dimensions();
    let mut data = ndarray::Array2::<u16>::zeros((w as usize, h as usize));
    for (x, y, pixel) in gray.enumerate_pixels() {
        data[[x as usize, y as usize]] = pixel.0[0];
    }
    Ok(data)
}
