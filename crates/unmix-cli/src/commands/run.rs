use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::debug;
use unmix_core::filters::median::MedianBorder;
use unmix_core::pipeline::config::PipelineConfig;
use unmix_core::pipeline::run_batch;
use unmix_core::reference::{ChannelSelection, LaserChannelMap};
use unmix_core::unmix::{FailureMode, Smoothing, UnmixConfig};

use crate::progress::BarReporter;
use crate::summary::{print_batch_report, print_run_summary};

#[derive(Args)]
pub struct RunArgs {
    /// Raw band stack, or a directory of them (each with a .toml sidecar)
    pub input: Option<PathBuf>,

    /// Reference CSV, or a directory of per-laser references
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Output directory [default: unmixed]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pipeline config file (TOML); command-line paths override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Worker threads (0 = all cores but one, 1 = serial)
    #[arg(long, default_value = "0")]
    pub workers: usize,

    /// Pixels per worker task
    #[arg(long, default_value = "4096")]
    pub chunk_size: usize,

    /// Skip the 3x3 median filter
    #[arg(long)]
    pub no_smooth: bool,

    /// Replicate edge pixels instead of zero-padding during smoothing
    #[arg(long)]
    pub replicate_border: bool,

    /// Zero-fill pixels that cannot be solved instead of aborting
    #[arg(long)]
    pub lenient: bool,

    /// NNLS iteration cap per pixel
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Keep only channels excited by each image's lasers
    #[arg(long)]
    pub by_laser: bool,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid pipeline config")?
    } else {
        build_config_from_args(args)
    };
    if let Some(ref input) = args.input {
        config.input = input.clone();
    }
    if let Some(ref reference) = args.reference {
        config.reference = reference.clone();
    }
    if args.config.is_none() && (args.input.is_none() || args.reference.is_none()) {
        bail!("An input and a --reference are required without --config");
    }
    if let Some(ref output) = args.output {
        config.output = output.clone();
    }

    debug!(?config, "Resolved pipeline config");
    print_run_summary(&config);

    let reporter = BarReporter::new()?;
    let report = run_batch(&config, &reporter)?;
    reporter.finish();

    print_batch_report(&report);
    println!("Output saved to {}", config.output.display());

    if report.processed.is_empty() && !report.failed.is_empty() {
        bail!("No image could be unmixed");
    }
    Ok(())
}

fn build_config_from_args(args: &RunArgs) -> PipelineConfig {
    let smoothing = if args.no_smooth {
        Smoothing::disabled()
    } else {
        Smoothing {
            enabled: true,
            border: if args.replicate_border {
                MedianBorder::Replicate
            } else {
                MedianBorder::Zero
            },
        }
    };

    let channels = if args.by_laser {
        ChannelSelection::ByLaser(LaserChannelMap::default())
    } else {
        ChannelSelection::All
    };

    PipelineConfig {
        input: args.input.clone().unwrap_or_default(),
        output: args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from("unmixed")),
        reference: args.reference.clone().unwrap_or_default(),
        channels,
        unmix: UnmixConfig {
            smoothing,
            workers: args.workers,
            chunk_size: args.chunk_size,
            failure_mode: if args.lenient {
                FailureMode::Lenient
            } else {
                FailureMode::Strict
            },
            max_iterations: args.max_iterations,
        },
    }
}
