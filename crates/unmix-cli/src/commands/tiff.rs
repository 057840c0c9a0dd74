use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use unmix_core::io::tiff::TiffBandSource;
use unmix_core::pipeline::process_image;
use unmix_core::reference::{load_reference, ChannelSelection, LaserChannelMap};
use unmix_core::unmix::{FailureMode, Smoothing, UnmixConfig};

use crate::progress::BarReporter;

#[derive(Args)]
pub struct TiffArgs {
    /// One grayscale TIFF per band, in band order
    #[arg(required = true)]
    pub bands: Vec<PathBuf>,

    /// Reference spectra CSV
    #[arg(short, long)]
    pub reference: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "unmixed")]
    pub output: PathBuf,

    /// Excitation laser in nm; keeps only the channels it excites (repeatable)
    #[arg(long = "laser")]
    pub lasers: Vec<u32>,

    /// Output file stem (defaults to the first band's file stem)
    #[arg(long)]
    pub stem: Option<String>,

    /// Skip the 3x3 median filter
    #[arg(long)]
    pub no_smooth: bool,

    /// Worker threads (0 = all cores but one, 1 = serial)
    #[arg(long, default_value = "0")]
    pub workers: usize,

    /// Zero-fill pixels that cannot be solved instead of aborting
    #[arg(long)]
    pub lenient: bool,
}

pub fn run(args: &TiffArgs) -> Result<()> {
    let reference = load_reference(&args.reference)
        .with_context(|| format!("Failed to load {}", args.reference.display()))?;
    let source = TiffBandSource::open(&args.bands, args.lasers.clone(), None)
        .context("Failed to load band images")?;

    let stem = match args.stem {
        Some(ref stem) => stem.clone(),
        None => args
            .bands
            .first()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string(),
    };
    let selection = if args.lasers.is_empty() {
        ChannelSelection::All
    } else {
        ChannelSelection::ByLaser(LaserChannelMap::default())
    };
    let config = UnmixConfig {
        smoothing: if args.no_smooth {
            Smoothing::disabled()
        } else {
            Smoothing::default()
        },
        workers: args.workers,
        failure_mode: if args.lenient {
            FailureMode::Lenient
        } else {
            FailureMode::Strict
        },
        ..Default::default()
    };

    println!("Bands:     {}", args.bands.len());
    println!("Reference: {} channels", reference.channels());
    println!("Keep:      {}", selection);
    println!();

    let reporter = BarReporter::new()?;
    let report = process_image(
        &source,
        &reference,
        &selection,
        &config,
        &args.output,
        &stem,
        &reporter,
    )?;
    reporter.finish();
    report.manifest.save(&args.output, &stem)?;

    println!();
    for path in &report.written {
        println!("  {}", path.display());
    }
    if report.total_failures() > 0 {
        println!("{} pixel(s) could not be solved and were zero-filled", report.total_failures());
    }

    Ok(())
}
