use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_CHUNK_SIZE;
use crate::filters::median::MedianBorder;

/// What to do when a single pixel cannot be solved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureMode {
    /// Abort the plane on the first failing pixel.
    #[default]
    Strict,
    /// Zero-fill the failing pixel, record it, and keep going.
    Lenient,
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "Strict"),
            Self::Lenient => write!(f, "Lenient"),
        }
    }
}

/// Spatial denoising applied before the per-pixel solve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Smoothing {
    /// Apply the 3x3 per-band median filter.
    pub enabled: bool,
    pub border: MedianBorder,
}

impl Default for Smoothing {
    fn default() -> Self {
        Self {
            enabled: true,
            border: MedianBorder::Zero,
        }
    }
}

impl Smoothing {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

impl fmt::Display for Smoothing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.enabled {
            write!(f, "Median 3x3 ({} border)", self.border)
        } else {
            write!(f, "Off")
        }
    }
}

/// Per-call unmixing configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnmixConfig {
    pub smoothing: Smoothing,
    /// Worker threads. 0 = all cores but one, 1 = serial.
    pub workers: usize,
    /// Pixels per worker task (default: 4096).
    pub chunk_size: usize,
    pub failure_mode: FailureMode,
    /// NNLS iteration cap. `None` uses 3 x channel count.
    pub max_iterations: Option<usize>,
}

impl Default for UnmixConfig {
    fn default() -> Self {
        Self {
            smoothing: Smoothing::default(),
            workers: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            failure_mode: FailureMode::Strict,
            max_iterations: None,
        }
    }
}

impl UnmixConfig {
    /// Single-threaded configuration, otherwise default.
    pub fn serial() -> Self {
        Self {
            workers: 1,
            ..Default::default()
        }
    }

    /// Worker count with `0` resolved against the machine's core count.
    pub fn resolved_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1)
    }
}
