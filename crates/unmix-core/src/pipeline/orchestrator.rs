use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, UnmixError};
use crate::io::manifest::OutputManifest;
use crate::io::raw::RawStackReader;
use crate::io::tiff::write_output;
use crate::io::ImageSource;
use crate::reference::{
    is_single_shot, list_reference_files, load_reference, select_reference_file, ChannelSelector,
};
use crate::spectral::{BandStack, OutputImage, ReferenceMatrix};
use crate::unmix::{
    reassemble, unmix_with_progress, vectorize_with_workers, PixelFailure, UnmixConfig,
};

use super::config::PipelineConfig;
use super::types::{BatchReport, ImageReport, PipelineStage, PlaneFailures, ProgressReporter};

/// Unmix one in-memory plane: vectorize, solve every pixel, reassemble.
///
/// `channel_order` is passed straight to reassembly (`None` keeps all).
pub fn unmix_plane(
    stack: &BandStack,
    reference: &ReferenceMatrix,
    channel_order: Option<&[usize]>,
    config: &UnmixConfig,
    reporter: &dyn ProgressReporter,
) -> Result<(OutputImage<u16>, Vec<PixelFailure>)> {
    let layout = stack.layout();

    reporter.begin_stage(PipelineStage::Vectorizing, None);
    let pixels = vectorize_with_workers(
        stack,
        reference.bands(),
        &config.smoothing,
        config.resolved_workers(),
    )?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Unmixing, Some(layout.pixel_count()));
    let unmixed = unmix_with_progress(reference, &pixels, layout, config, |done| {
        reporter.advance(done)
    })?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Reassembling, None);
    let output = reassemble(&unmixed.solution, layout, channel_order, reference.labels())?;
    reporter.finish_stage();

    Ok((output, unmixed.failures))
}

/// Unmix every plane of `source` and write the kept channels to `output_dir`.
///
/// Errors carry the image stem and plane index; nothing is written for the
/// failing plane. The manifest is returned in the report, not saved.
pub fn process_image(
    source: &dyn ImageSource,
    reference: &ReferenceMatrix,
    selector: &dyn ChannelSelector,
    config: &UnmixConfig,
    output_dir: &Path,
    stem: &str,
    reporter: &dyn ProgressReporter,
) -> Result<ImageReport> {
    let info = source.info().clone();
    let channel_order = selector.select(reference.labels(), &info.lasers)?;
    info!(
        image = stem,
        planes = info.planes,
        bands = info.bands,
        channels = channel_order.len(),
        lasers = ?info.lasers,
        "Processing image"
    );
    reporter.begin_image(stem, info.planes);

    let mut report = ImageReport {
        stem: stem.to_string(),
        written: Vec::new(),
        manifest: OutputManifest {
            channels: channel_order
                .iter()
                .map(|&c| reference.labels()[c].clone())
                .collect(),
            planes: info.planes,
            pixels_per_cm: info.scale.map(|s| s.pixels_per_cm()),
            failures_per_plane: Vec::with_capacity(info.planes),
            scale: info.scale,
        },
        failures: Vec::new(),
        complete: true,
    };

    for plane in 0..info.planes {
        if reporter.is_cancelled() {
            warn!(image = stem, plane, "Cancelled before plane");
            report.complete = false;
            break;
        }
        let (written, failures) = process_plane(
            source,
            reference,
            &channel_order,
            config,
            output_dir,
            stem,
            plane,
            reporter,
        )
        .map_err(|e| e.in_plane(stem, plane))?;
        info!(image = stem, plane, failures = failures.len(), "Plane unmixed");
        report.written.extend(written);
        report.manifest.failures_per_plane.push(failures.len());
        if !failures.is_empty() {
            report.failures.push(PlaneFailures {
                plane,
                pixels: failures,
            });
        }
    }

    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn process_plane(
    source: &dyn ImageSource,
    reference: &ReferenceMatrix,
    channel_order: &[usize],
    config: &UnmixConfig,
    output_dir: &Path,
    stem: &str,
    plane: usize,
    reporter: &dyn ProgressReporter,
) -> Result<(Vec<PathBuf>, Vec<PixelFailure>)> {
    reporter.begin_stage(PipelineStage::Reading, None);
    let stack = source.read_plane(plane)?;
    reporter.finish_stage();

    let (mut output, failures) =
        unmix_plane(&stack, reference, Some(channel_order), config, reporter)?;
    output.scale = source.info().scale;

    reporter.begin_stage(PipelineStage::Writing, Some(output.channels()));
    let written = write_output(&output, output_dir, stem, plane)?;
    reporter.finish_stage();

    Ok((written, failures))
}

/// Output stem for a single-laser shot: drops every `_`-separated part of
/// the input stem that mentions the laser wavelength.
pub fn shot_stem(stem: &str, laser: u32) -> String {
    let needle = laser.to_string();
    stem.split('_')
        .filter(|part| !part.contains(&needle))
        .collect::<Vec<_>>()
        .join("_")
}

/// Raw stacks to process: the input itself, or the sorted `.raw` files in it.
pub fn list_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        let is_raw = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("raw"));
        if path.is_file() && is_raw {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Process every input image of `config`, skipping images that fail.
///
/// Invariant violations are bugs and abort the whole batch.
pub fn run_batch(config: &PipelineConfig, reporter: &dyn ProgressReporter) -> Result<BatchReport> {
    let inputs = list_inputs(&config.input)?;
    let references = if config.reference.is_dir() {
        list_reference_files(&config.reference)?
    } else {
        vec![config.reference.clone()]
    };
    let single_shot = is_single_shot(&references);
    info!(
        images = inputs.len(),
        references = references.len(),
        single_shot,
        "Starting batch"
    );
    std::fs::create_dir_all(&config.output)?;

    let mut report = BatchReport::default();
    let mut written_manifests = HashMap::new();
    for input in &inputs {
        if reporter.is_cancelled() {
            report.cancelled = true;
            break;
        }
        let name = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string();

        let result = process_input(
            input,
            &name,
            &references,
            single_shot,
            config,
            &mut written_manifests,
            reporter,
        );
        match result {
            Ok(image) => {
                if !image.complete {
                    report.cancelled = true;
                }
                report.processed.push(image);
            }
            Err(e) if e.is_invariant_violation() => return Err(e),
            Err(e) => {
                warn!(image = %name, error = %e, "Skipping image");
                report.failed.push((name, e.to_string()));
            }
        }
        if report.cancelled {
            break;
        }
    }

    Ok(report)
}

fn process_input(
    input: &Path,
    name: &str,
    references: &[PathBuf],
    single_shot: bool,
    config: &PipelineConfig,
    written_manifests: &mut HashMap<String, OutputManifest>,
    reporter: &dyn ProgressReporter,
) -> Result<ImageReport> {
    let reader = RawStackReader::open_with_sidecar(input)?;
    let lasers = reader.info().lasers.clone();
    let reference_path = select_reference_file(references, &lasers)?;
    let reference = load_reference(&reference_path)?;
    info!(image = name, reference = %reference_path.display(), "Selected reference");

    let stem = match (single_shot, lasers.first()) {
        (true, Some(&laser)) => shot_stem(name, laser),
        _ => name.to_string(),
    };
    if reference.bands() != reader.info().bands {
        return Err(
            UnmixError::shape("reference rows", reader.info().bands, reference.bands())
                .in_plane(&stem, 0),
        );
    }

    let image = process_image(
        &reader,
        &reference,
        &config.channels,
        &config.unmix,
        &config.output,
        &stem,
        reporter,
    )?;

    // Shots merge only with manifests saved earlier in this batch; a file
    // left by a previous run is overwritten.
    let manifest = match written_manifests.get(&stem) {
        Some(earlier) if single_shot => {
            let mut merged = earlier.clone();
            merged.merge(&image.manifest);
            merged
        }
        _ => image.manifest.clone(),
    };
    manifest.save(&config.output, &stem)?;
    written_manifests.insert(stem, manifest);

    Ok(image)
}
