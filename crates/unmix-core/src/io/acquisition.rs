use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnmixError};
use crate::spectral::PixelScale;

/// Instrument metadata describing a band-stack acquisition.
///
/// Stored as a TOML sidecar next to the data file (`<stem>.toml`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionInfo {
    /// Spectral bands per pixel.
    pub bands: usize,
    pub width: usize,
    pub height: usize,
    /// Z planes (default: 1).
    #[serde(default = "default_planes")]
    pub planes: usize,
    /// Sample bit depth, 8 or 16 (default: 16).
    #[serde(default = "default_bit_depth")]
    pub bit_depth: u8,
    /// Excitation laser wavelengths in nm.
    #[serde(default)]
    pub lasers: Vec<u32>,
    #[serde(default)]
    pub scale: Option<PixelScale>,
}

fn default_planes() -> usize {
    1
}

fn default_bit_depth() -> u8 {
    16
}

impl AcquisitionInfo {
    /// Sidecar location for a data file: same stem, `.toml` extension.
    pub fn sidecar_path(data_path: &Path) -> PathBuf {
        data_path.with_extension("toml")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let info: Self = toml::from_str(&text)
            .map_err(|e| UnmixError::Config(format!("{}: {e}", path.display())))?;
        info.validate()?;
        Ok(info)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| UnmixError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.bands == 0 || self.width == 0 || self.height == 0 || self.planes == 0 {
            return Err(UnmixError::InvalidSource(format!(
                "empty acquisition: {} bands, {}x{}, {} planes",
                self.bands, self.width, self.height, self.planes
            )));
        }
        if !matches!(self.bit_depth, 8 | 16) {
            return Err(UnmixError::InvalidSource(format!(
                "unsupported bit depth {}",
                self.bit_depth
            )));
        }
        Ok(())
    }

    pub fn bytes_per_sample(&self) -> usize {
        if self.bit_depth <= 8 {
            1
        } else {
            2
        }
    }

    /// Bytes in one plane (all bands).
    pub fn plane_byte_size(&self) -> usize {
        self.bands * self.width * self.height * self.bytes_per_sample()
    }
}
