use std::path::PathBuf;

use crate::io::manifest::OutputManifest;
use crate::unmix::PixelFailure;

/// Per-plane processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Reading,
    Vectorizing,
    Unmixing,
    Reassembling,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reading => write!(f, "Reading bands"),
            Self::Vectorizing => write!(f, "Vectorizing"),
            Self::Unmixing => write!(f, "Unmixing"),
            Self::Reassembling => write!(f, "Reassembling"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new image has started.
    fn begin_image(&self, _name: &str, _planes: usize) {}

    /// A new stage has started. `total_items` is the number of work items
    /// in this stage (pixels while unmixing), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// `items_done` work items of the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}

    /// Checked between planes and between images; a true result stops the run.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// No-op progress reporter.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// What was produced for one image.
#[derive(Clone, Debug)]
pub struct ImageReport {
    /// Output stem the files were written under.
    pub stem: String,
    pub written: Vec<PathBuf>,
    pub manifest: OutputManifest,
    /// Zero-filled pixels of every plane that had any, in plane order.
    pub failures: Vec<PlaneFailures>,
    /// False if cancellation stopped the image before its last plane.
    pub complete: bool,
}

/// Lenient-mode failures of one plane, sorted by pixel index.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaneFailures {
    pub plane: usize,
    pub pixels: Vec<PixelFailure>,
}

impl ImageReport {
    pub fn total_failures(&self) -> usize {
        self.manifest.failures_per_plane.iter().sum()
    }
}

/// Outcome of a batch run.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<ImageReport>,
    /// Images that were skipped, with the reason.
    pub failed: Vec<(String, String)>,
    pub cancelled: bool,
}
