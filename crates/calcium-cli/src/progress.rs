use calcium_core::{PopulateReporter, PopulateSummary, ProcessingTaskKey, TriggerOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Progress bar over the pending tasks checked by `populate`.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl PopulateReporter for CliReporter {
    fn on_populate_start(&self, pending_tasks: usize) {
        let pb = ProgressBar::new(pending_tasks as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Checking [{bar:30.cyan/dim}] {pos}/{len} tasks {msg}",
        ) {
            pb.set_style(
                style
                    .progress_chars("━╸─")
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_task_checked(&self, key: &ProcessingTaskKey, outcome: &TriggerOutcome) {
        self.with_bar(|pb| {
            if let TriggerOutcome::Completed { files } = outcome {
                pb.println(format!("  \x1b[32m✓\x1b[0m {}: {} files", key, files));
            }
            pb.inc(1);
        });
    }

    fn on_populate_complete(&self, summary: &PopulateSummary, duration_secs: f64) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        eprintln!(
            "  \x1b[32m✓\x1b[0m Populate complete: {} of {} tasks done, {} files in {:.2}s",
            summary.tasks_completed, summary.tasks_checked, summary.files_registered, duration_secs
        );
    }
}
