use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use unmix_core::reference::load_reference;

#[derive(Args)]
pub struct InfoArgs {
    /// Reference spectra CSV
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let reference = load_reference(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    println!("File:        {}", args.file.display());
    println!("Bands:       {}", reference.bands());
    println!("Channels:    {}", reference.channels());
    println!();

    for (c, label) in reference.labels().iter().enumerate() {
        let column = reference.column(c);
        let peak = column
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (band, &v)| if v > best.1 { (band, v) } else { best });
        println!("  [{:>2}] {:<16} peak band {:>2} ({:.3})", c, label, peak.0, peak.1);
    }

    Ok(())
}
