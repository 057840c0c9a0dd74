mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "unmix", about = "Linear spectral unmixing for fluorescence microscopy")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a reference spectra table
    Info(commands::info::InfoArgs),
    /// Unmix raw band stacks (a file or a directory)
    Run(commands::run::RunArgs),
    /// Unmix one plane given as per-band TIFF images
    Tiff(commands::tiff::TiffArgs),
    /// Print or save the default pipeline config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Tiff(args) => commands::tiff::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
