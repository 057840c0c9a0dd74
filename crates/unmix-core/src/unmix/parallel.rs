use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::error::{Result, UnmixError};
use crate::spectral::{PixelLayout, PixelMatrix, ReferenceMatrix, SolutionMatrix};

use super::config::{FailureMode, UnmixConfig};
use super::nnls::{NnlsSolver, NnlsWorkspace, SolveFailure};

/// A pixel that was zero-filled in lenient mode.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelFailure {
    pub pixel: usize,
    pub x: usize,
    pub y: usize,
    pub reason: SolveFailure,
}

/// Result of unmixing one plane.
#[derive(Clone, Debug)]
pub struct Unmixed {
    /// Channel weights, shape = (channels, pixels), same pixel order as the input.
    pub solution: SolutionMatrix,
    /// Lenient-mode failures, sorted by pixel index. Always empty in strict mode.
    pub failures: Vec<PixelFailure>,
}

/// Solved weights for a contiguous run of pixels.
struct Chunk {
    start: usize,
    /// Pixel-major: `channels` weights per pixel.
    weights: Vec<f64>,
    failures: Vec<PixelFailure>,
}

/// Dedicated pool of `workers` threads named `unmix-worker-{i}`.
pub fn worker_pool(workers: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("unmix-worker-{i}"))
        .build()
        .map_err(|e| UnmixError::WorkerPool(e.to_string()))
}

/// Solve every pixel column of `pixels` against `reference`.
pub fn unmix(
    reference: &ReferenceMatrix,
    pixels: &PixelMatrix,
    layout: PixelLayout,
    config: &UnmixConfig,
) -> Result<Unmixed> {
    unmix_with_progress(reference, pixels, layout, config, |_| {})
}

/// Solve every pixel with progress reporting.
///
/// Calls `on_progress(pixels_done)` after each chunk. With one worker the
/// chunks run in order on the calling thread; otherwise they are spread over
/// a dedicated pool of `workers` threads. The solution is identical either way.
pub fn unmix_with_progress(
    reference: &ReferenceMatrix,
    pixels: &PixelMatrix,
    layout: PixelLayout,
    config: &UnmixConfig,
    on_progress: impl Fn(usize) + Send + Sync,
) -> Result<Unmixed> {
    if pixels.nrows() != reference.bands() {
        return Err(UnmixError::shape(
            "pixel matrix bands",
            reference.bands(),
            pixels.nrows(),
        ));
    }
    let n = layout.pixel_count();
    if pixels.ncols() != n {
        return Err(UnmixError::shape("pixel matrix columns", n, pixels.ncols()));
    }

    let solver = NnlsSolver::new(reference, config.max_iterations);
    let workers = config.resolved_workers();
    let chunk_size = config.chunk_size.max(1);
    let ranges: Vec<Range<usize>> = (0..n)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(n))
        .collect();

    debug!(
        workers,
        chunks = ranges.len(),
        chunk_size,
        max_iterations = solver.max_iterations(),
        "Unmixing plane"
    );

    let done = AtomicUsize::new(0);
    let run_chunk = |range: &Range<usize>| -> Result<Chunk> {
        let chunk = solve_chunk(&solver, pixels, layout, range.clone(), config.failure_mode)?;
        let completed = done.fetch_add(range.len(), Ordering::Relaxed) + range.len();
        on_progress(completed);
        Ok(chunk)
    };

    let chunks: Vec<Chunk> = if workers == 1 {
        ranges.iter().map(run_chunk).collect::<Result<_>>()?
    } else {
        let pool = worker_pool(workers)?;
        pool.install(|| ranges.par_iter().map(run_chunk).collect::<Result<_>>())?
    };

    let unmixed = gather(chunks, reference.channels(), n)?;
    if let Some(first) = unmixed.failures.first() {
        warn!(
            count = unmixed.failures.len(),
            first_pixel = first.pixel,
            reason = %first.reason,
            "Pixels could not be unmixed and were zero-filled"
        );
    }
    Ok(unmixed)
}

fn solve_chunk(
    solver: &NnlsSolver,
    pixels: &PixelMatrix,
    layout: PixelLayout,
    range: Range<usize>,
    mode: FailureMode,
) -> Result<Chunk> {
    let channels = solver.channels();
    let mut ws = NnlsWorkspace::new(channels);
    let mut weights = vec![0.0f64; range.len() * channels];
    let mut failures = Vec::new();

    for (offset, pixel) in range.clone().enumerate() {
        let out = &mut weights[offset * channels..(offset + 1) * channels];
        if let Err(reason) = solver.solve_into(pixels.column(pixel), &mut ws, out)? {
            let (x, y) = layout.coords(pixel);
            match mode {
                FailureMode::Strict => {
                    return Err(UnmixError::SolverNonConvergence {
                        pixel,
                        x,
                        y,
                        reason,
                    })
                }
                FailureMode::Lenient => failures.push(PixelFailure {
                    pixel,
                    x,
                    y,
                    reason,
                }),
            }
        }
    }

    Ok(Chunk {
        start: range.start,
        weights,
        failures,
    })
}

/// Write chunks into the solution by their pixel index, checking that they
/// tile `0..n` exactly.
fn gather(mut chunks: Vec<Chunk>, channels: usize, n: usize) -> Result<Unmixed> {
    chunks.sort_by_key(|c| c.start);

    let mut solution = Array2::<f64>::zeros((channels, n));
    let mut failures = Vec::new();
    let mut covered = 0usize;

    for chunk in chunks {
        if chunk.start != covered {
            return Err(UnmixError::InvariantViolation(format!(
                "chunk starts at pixel {} but {} pixels were gathered",
                chunk.start, covered
            )));
        }
        for (offset, w) in chunk.weights.chunks_exact(channels).enumerate() {
            solution
                .column_mut(chunk.start + offset)
                .assign(&ArrayView1::from(w));
        }
        covered += chunk.weights.len() / channels;
        failures.extend(chunk.failures);
    }

    if covered != n {
        return Err(UnmixError::InvariantViolation(format!(
            "gathered {covered} of {n} pixels"
        )));
    }

    failures.sort_by_key(|f| f.pixel);
    Ok(Unmixed { solution, failures })
}
