use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use unmix_core::pipeline::{PipelineStage, ProgressReporter};

/// Drives one indicatif bar, reset at every stage.
pub struct BarReporter {
    bar: ProgressBar,
    /// Highest count seen in the current stage. Workers may report out of order.
    done: AtomicU64,
}

impl BarReporter {
    pub fn new() -> anyhow::Result<Self> {
        let bar = ProgressBar::new(1);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:24} {msg:16} [{bar:40}] {percent}%")?
                .progress_chars("=> "),
        );
        Ok(Self::with_bar(bar))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            done: AtomicU64::new(0),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Done");
    }
}

impl ProgressReporter for BarReporter {
    fn begin_image(&self, name: &str, planes: usize) {
        self.bar.set_prefix(format!("{name} ({planes} z)"));
    }

    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.done.store(0, Ordering::Relaxed);
        self.bar.set_message(stage.to_string());
        self.bar.set_length(total_items.unwrap_or(1).max(1) as u64);
        self.bar.set_position(0);
    }

    fn advance(&self, items_done: usize) {
        let done = items_done as u64;
        let previous = self.done.fetch_max(done, Ordering::Relaxed);
        if done > previous {
            self.bar.inc(done - previous);
        }
    }

    fn finish_stage(&self) {
        if let Some(len) = self.bar.length() {
            self.done.store(len, Ordering::Relaxed);
            self.bar.set_position(len);
        }
    }
}
