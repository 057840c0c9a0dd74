use console::Style;
use unmix_core::pipeline::config::PipelineConfig;
use unmix_core::pipeline::BatchReport;
use unmix_core::reference::ChannelSelection;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    error: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            error: Style::new().red(),
        }
    }
}

pub fn print_run_summary(config: &PipelineConfig) {
    let s = Styles::new();
    let unmix = &config.unmix;

    println!();
    println!("  {}", s.title.apply_to("Spectral Unmixing"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(17)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(config.input.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Reference"),
        s.path.apply_to(config.reference.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output.display())
    );
    println!();

    println!("  {}", s.header.apply_to("Unmixing"));
    if unmix.smoothing.enabled {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Smoothing"),
            s.method.apply_to(&unmix.smoothing)
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Smoothing"),
            s.disabled.apply_to("off")
        );
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Workers"),
        s.value.apply_to(unmix.resolved_workers())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Chunk"),
        s.value.apply_to(format!("{} px", unmix.chunk_size))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Failures"),
        s.method.apply_to(unmix.failure_mode)
    );
    if let Some(max) = unmix.max_iterations {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Max iter"),
            s.value.apply_to(max)
        );
    }
    match &config.channels {
        ChannelSelection::All => println!(
            "    {:<12}{}",
            s.label.apply_to("Channels"),
            s.disabled.apply_to("all")
        ),
        by_laser => println!(
            "    {:<12}{}",
            s.label.apply_to("Channels"),
            s.method.apply_to(by_laser)
        ),
    }
    println!();
}

pub fn print_batch_report(report: &BatchReport) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Results"));
    for image in &report.processed {
        let failures = image.total_failures();
        let detail = if failures > 0 {
            s.disabled
                .apply_to(format!("{} files, {failures} failed px", image.written.len()))
        } else {
            s.value.apply_to(format!("{} files", image.written.len()))
        };
        println!("    {:<24}{}", s.label.apply_to(&image.stem), detail);
        for plane in &image.failures {
            if let Some(first) = plane.pixels.first() {
                println!(
                    "      {}",
                    s.disabled.apply_to(format!(
                        "z{}: {} px, first at ({}, {}): {}",
                        plane.plane,
                        plane.pixels.len(),
                        first.x,
                        first.y,
                        first.reason
                    ))
                );
            }
        }
    }
    for (name, reason) in &report.failed {
        println!(
            "    {:<24}{}",
            s.label.apply_to(name),
            s.error.apply_to(reason)
        );
    }
    if report.cancelled {
        println!("    {}", s.disabled.apply_to("cancelled"));
    }
    println!();
}
