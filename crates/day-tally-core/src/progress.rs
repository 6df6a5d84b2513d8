use tracing::{info, warn};

use crate::tally::ScanSummary;

/// Trait for reporting run progress.
///
/// The CLI implements it with indicatif; tests use [`SilentReporter`].
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_discover_complete(&self, _subjects: &[String]) {}
    fn on_scan_progress(&self, _files_scanned: usize, _errors: usize, _subject: &str, _dir: &str) {}
    fn on_subject_failed(&self, _subject: &str, _reason: &str) {}
    fn on_scan_complete(&self, _summary: &ScanSummary, _duration_secs: f64) {}
    fn on_persist_start(&self, _rows: usize) {}
    fn on_persist_complete(&self, _rows: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Writes progress as log lines; useful when stdout is not a terminal.
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn on_discover_complete(&self, subjects: &[String]) {
        info!("Discovered {} subject folders: {:?}", subjects.len(), subjects);
    }

    fn on_scan_progress(&self, files_scanned: usize, errors: usize, subject: &str, dir: &str) {
        info!(
            "Scanned {} files... (errors: {}) current folder: {} / {}",
            files_scanned, errors, subject, dir
        );
    }

    fn on_subject_failed(&self, subject: &str, reason: &str) {
        warn!("Subject {} failed: {}", subject, reason);
    }

    fn on_scan_complete(&self, summary: &ScanSummary, duration_secs: f64) {
        info!(
            "Done scanning in {:.2}s. Files scanned: {}. Errors: {}. Groups: {}",
            duration_secs, summary.files_scanned, summary.errors, summary.distinct_keys
        );
    }

    fn on_persist_complete(&self, rows: usize, duration_secs: f64) {
        info!("Upserted {} rows in {:.2}s", rows, duration_secs);
    }
}
