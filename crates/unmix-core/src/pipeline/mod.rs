pub mod config;
mod orchestrator;
mod types;

pub use orchestrator::{list_inputs, process_image, run_batch, shot_stem, unmix_plane};
pub use types::{
    BatchReport, ImageReport, NoOpReporter, PipelineStage, PlaneFailures, ProgressReporter,
};
