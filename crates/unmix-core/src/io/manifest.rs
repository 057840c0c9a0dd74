use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::OUTPUT_SUFFIX;
use crate::error::{Result, UnmixError};
use crate::spectral::PixelScale;

/// Sidecar written next to the unmixed channel images.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputManifest {
    /// Kept channel labels, in output order.
    pub channels: Vec<String>,
    pub planes: usize,
    /// Resolution in pixels per centimetre (x, y).
    pub pixels_per_cm: Option<(f64, f64)>,
    /// Zero-filled pixel count per plane (lenient mode).
    pub failures_per_plane: Vec<usize>,
    /// Pixel size in micrometres.
    pub scale: Option<PixelScale>,
}

impl OutputManifest {
    pub fn path(dir: &Path, stem: &str) -> PathBuf {
        dir.join(format!("{stem}{OUTPUT_SUFFIX}.toml"))
    }

    pub fn save(&self, dir: &Path, stem: &str) -> Result<PathBuf> {
        let path = Self::path(dir, stem);
        let text = toml::to_string_pretty(self).map_err(|e| UnmixError::Config(e.to_string()))?;
        std::fs::write(&path, text)?;
        Ok(path)
    }

    /// Fold in another shot of the same sample (single-laser acquisitions
    /// written under one stem).
    pub fn merge(&mut self, other: &OutputManifest) {
        self.channels.extend(other.channels.iter().cloned());
        self.planes = self.planes.max(other.planes);
        if self.failures_per_plane.len() < other.failures_per_plane.len() {
            self.failures_per_plane
                .resize(other.failures_per_plane.len(), 0);
        }
        for (mine, theirs) in self.failures_per_plane.iter_mut().zip(&other.failures_per_plane) {
            *mine += theirs;
        }
        if self.scale.is_none() {
            self.scale = other.scale;
            self.pixels_per_cm = other.pixels_per_cm;
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| UnmixError::Config(format!("{}: {e}", path.display())))
    }
}
