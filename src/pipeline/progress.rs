// file: src/pipeline/progress.rs
// description: terminal progress bar for sync runs
// reference: uses indicatif for progress bars

use crate::models::SyncOutcome;
use indicatif::{ProgressBar, ProgressStyle};

/// One tick per record. Totals live in `RunSummary`.
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    pub fn new(total_records: usize, visible: bool) -> Self {
        let bar = if visible {
            create_progress_bar(total_records as u64)
        } else {
            ProgressBar::hidden()
        };

        Self { bar }
    }

    pub fn start_record(&self, uri: &str) {
        self.bar.set_message(uri.to_string());
    }

    pub fn finish_record(&self, outcome: &SyncOutcome) {
        if let SyncOutcome::Reported { stage, .. } = outcome {
            self.bar
                .println(format!("failed at {:?}: {}", stage, self.bar.message()));
        }
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("█▓▒░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}
