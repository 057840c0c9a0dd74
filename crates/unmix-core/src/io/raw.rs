use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::Array3;

use crate::error::{Result, UnmixError};
use crate::spectral::BandStack;

use super::acquisition::AcquisitionInfo;
use super::ImageSource;

/// Memory-mapped reader for headerless little-endian band stacks.
///
/// Samples are stored plane by plane, band by band, each band as `height`
/// rows of `width` samples (x fastest), as written by an ImageJ raw export.
pub struct RawStackReader {
    mmap: Mmap,
    info: AcquisitionInfo,
}

impl RawStackReader {
    /// Open a raw stack described by `info`.
    pub fn open(path: &Path, info: AcquisitionInfo) -> Result<Self> {
        info.validate()?;
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let expected = info.plane_byte_size() * info.planes;
        if mmap.len() < expected {
            return Err(UnmixError::InvalidSource(format!(
                "{} truncated: expected at least {} bytes, got {}",
                path.display(),
                expected,
                mmap.len()
            )));
        }

        Ok(Self { mmap, info })
    }

    /// Open a raw stack using its `<stem>.toml` sidecar.
    pub fn open_with_sidecar(path: &Path) -> Result<Self> {
        let info = AcquisitionInfo::load(&AcquisitionInfo::sidecar_path(path))?;
        Self::open(path, info)
    }

    /// Raw bytes of one plane (zero-copy from the mmap).
    pub fn plane_raw(&self, plane: usize) -> Result<&[u8]> {
        if plane >= self.info.planes {
            return Err(UnmixError::PlaneOutOfRange {
                index: plane,
                total: self.info.planes,
            });
        }
        let size = self.info.plane_byte_size();
        let offset = plane * size;
        Ok(&self.mmap[offset..offset + size])
    }
}

impl ImageSource for RawStackReader {
    fn info(&self) -> &AcquisitionInfo {
        &self.info
    }

    fn read_plane(&self, plane: usize) -> Result<BandStack> {
        let raw = self.plane_raw(plane)?;
        let (b, w, h) = (self.info.bands, self.info.width, self.info.height);
        let data = decode_plane(raw, b, w, h, self.info.bytes_per_sample())?;
        Ok(BandStack::new(data, self.info.bit_depth))
    }
}

fn decode_plane(raw: &[u8], bands: usize, w: usize, h: usize, bps: usize) -> Result<Array3<f32>> {
    let count = bands * w * h;
    let samples: Vec<f32> = if bps == 1 {
        raw[..count].iter().map(|&v| v as f32).collect()
    } else {
        let mut buf = vec![0u16; count];
        let mut cursor = std::io::Cursor::new(raw);
        cursor.read_u16_into::<LittleEndian>(&mut buf)?;
        buf.into_iter().map(|v| v as f32).collect()
    };

    // File order is [band][y][x]; the stack is indexed [band, x, y].
    let mut data = Array3::<f32>::zeros((bands, w, h));
    for band in 0..bands {
        let base = band * w * h;
        for y in 0..h {
            for x in 0..w {
                data[[band, x, y]] = samples[base + y * w + x];
            }
        }
    }
    Ok(data)
}
