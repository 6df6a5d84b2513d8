use chrono::NaiveDate;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One output row identity: (person, day).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayKey {
    pub person: String,
    pub day: NaiveDate,
}

impl DayKey {
    pub fn new(person: impl Into<String>, day: NaiveDate) -> Self {
        Self {
            person: person.into(),
            day,
        }
    }
}

/// A row ready for the store, in (person, day) order when produced by [`DailyTally::into_rows`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub person: String,
    pub day: NaiveDate,
    pub file_count: i64,
}

/// Counters reported alongside the aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Files evaluated one by one (batch directories excluded).
    pub files_scanned: usize,
    /// Files whose timestamp could not be read.
    pub errors: usize,
    /// Individually evaluated files that fell outside the window.
    pub out_of_window: usize,
    /// Batch directories that contributed the synthetic weight.
    pub batch_directories: usize,
    /// Batch directories skipped because the representative was unreadable or out of window.
    pub batch_omitted: usize,
    /// Nested directories that could not be listed.
    pub directory_errors: usize,
    pub distinct_keys: usize,
}

/// Run-scoped accumulator shared by the folder workers.
#[derive(Debug, Default)]
pub struct DailyTally {
    counts: DashMap<DayKey, u64>,
    files_scanned: AtomicUsize,
    errors: AtomicUsize,
    out_of_window: AtomicUsize,
    batch_directories: AtomicUsize,
    batch_omitted: AtomicUsize,
    directory_errors: AtomicUsize,
}

impl DailyTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, key: DayKey, amount: u64) {
        *self.counts.entry(key).or_insert(0) += amount;
    }

    /// Records one individually evaluated file; returns the running total.
    pub fn file_scanned(&self) -> usize {
        self.files_scanned.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn file_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn file_out_of_window(&self) {
        self.out_of_window.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_counted(&self) {
        self.batch_directories.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_omitted(&self) {
        self.batch_omitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn directory_error(&self) {
        self.directory_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn get(&self, key: &DayKey) -> Option<u64> {
        self.counts.get(key).map(|v| *v)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|entry| *entry.value()).sum()
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            out_of_window: self.out_of_window.load(Ordering::Relaxed),
            batch_directories: self.batch_directories.load(Ordering::Relaxed),
            batch_omitted: self.batch_omitted.load(Ordering::Relaxed),
            directory_errors: self.directory_errors.load(Ordering::Relaxed),
            distinct_keys: self.counts.len(),
        }
    }

    /// Consumes the tally into rows sorted by person, then day.
    pub fn into_rows(self) -> Vec<DailyCount> {
        let mut rows: Vec<DailyCount> = self
            .counts
            .into_iter()
            .map(|(key, count)| DailyCount {
                person: key.person,
                day: key.day,
                file_count: count as i64,
            })
            .collect();
        rows.sort_by(|a, b| a.person.cmp(&b.person).then(a.day.cmp(&b.day)));
        rows
    }
}
