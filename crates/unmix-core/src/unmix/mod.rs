pub mod config;
pub mod nnls;
pub mod parallel;
pub mod reassemble;
pub mod vectorize;

pub use config::{FailureMode, Smoothing, UnmixConfig};
pub use nnls::{solve, NnlsSolver, SolveFailure};
pub use parallel::{unmix, unmix_with_progress, worker_pool, PixelFailure, Unmixed};
pub use reassemble::{reassemble, reassemble_as};
pub use vectorize::{vectorize, vectorize_with_workers};
