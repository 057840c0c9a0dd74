use thiserror::Error;

use crate::unmix::nnls::SolveFailure;

#[derive(Error, Debug)]
pub enum UnmixError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Solver did not converge at pixel {pixel} (x={x}, y={y}): {reason}")]
    SolverNonConvergence {
        pixel: usize,
        x: usize,
        y: usize,
        reason: SolveFailure,
    },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid reference matrix: {0}")]
    InvalidReference(String),

    #[error("Channel index {index} out of range (channels: {channels})")]
    ChannelOutOfRange { index: usize, channels: usize },

    #[error("No channel selection configured for laser {0} nm")]
    UnknownLaser(u32),

    #[error("No reference channel matches lasers {lasers:?}")]
    NoChannelsSelected { lasers: Vec<u32> },

    #[error("No reference file matches laser {0} nm")]
    NoReferenceForLaser(u32),

    #[error("Invalid image source: {0}")]
    InvalidSource(String),

    #[error("Plane index {index} out of range (total: {total})")]
    PlaneOutOfRange { index: usize, total: usize },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{image}, plane {plane}: {source}")]
    Plane {
        image: String,
        plane: usize,
        source: Box<UnmixError>,
    },
}

impl UnmixError {
    pub(crate) fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what,
            expected,
            actual,
        }
    }

    /// Attach image/plane context so the caller can skip the image and move on.
    pub fn in_plane(self, image: &str, plane: usize) -> Self {
        Self::Plane {
            image: image.to_string(),
            plane,
            source: Box::new(self),
        }
    }

    /// True for errors that indicate a bug rather than bad input data.
    pub fn is_invariant_violation(&self) -> bool {
        match self {
            Self::InvariantViolation(_) => true,
            Self::Plane { source, .. } => source.is_invariant_violation(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, UnmixError>;
