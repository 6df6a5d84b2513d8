use day_tally_core::{ProgressReporter, ScanSummary};
use indicatif::{HumanCount, ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// CLI progress reporter using an indicatif spinner.
///
/// - Scan phase: spinner with running file and error counts
/// - Persist phase: spinner
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        pb
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_discover_complete(&self, subjects: &[String]) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Found {} subject folders: {}",
            subjects.len(),
            subjects.join(", ")
        );
        self.set_bar(Self::spinner("Scanning files..."));
    }

    fn on_scan_progress(&self, files_scanned: usize, errors: usize, subject: &str, _dir: &str) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(format!(
                    "Scanned {} files... (errors: {}) current folder: {}",
                    HumanCount(files_scanned as u64),
                    errors,
                    subject
                ));
            }
        }
    }

    fn on_subject_failed(&self, subject: &str, reason: &str) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.println(format!("  \x1b[31m✗\x1b[0m {}: {}", subject, reason));
            }
        }
    }

    fn on_scan_complete(&self, summary: &ScanSummary, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} files, {} errors, {} keys in {:.2}s",
            HumanCount(summary.files_scanned as u64),
            summary.errors,
            summary.distinct_keys,
            duration_secs
        );
    }

    fn on_persist_start(&self, rows: usize) {
        self.set_bar(Self::spinner(&format!("Upserting {} rows...", rows)));
    }

    fn on_persist_complete(&self, rows: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Database write complete: {} rows in {:.2}s",
            rows, duration_secs
        );
    }
}
