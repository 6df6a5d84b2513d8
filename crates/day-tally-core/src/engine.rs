use rayon::prelude::*;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::scanner::{FolderWalker, SubjectFilter, SubjectFolder};
use crate::storage::CountStore;
use crate::tally::{DailyCount, DailyTally, ScanSummary};

/// A subject whose folder could not be walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectFailure {
    pub subject: String,
    pub reason: String,
}

/// Final status of a run that got through PERSIST (or a dry run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Rows were produced, but this many subject folders could not be walked.
    CompletedWithFailures(usize),
}

impl RunStatus {
    pub fn is_clean(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "COMPLETED"),
            RunStatus::CompletedWithFailures(n) => {
                write!(f, "COMPLETED with {} failed subject(s)", n)
            }
        }
    }
}

/// Output of DISCOVER + AGGREGATE.
#[derive(Debug)]
pub struct Aggregate {
    pub subjects: Vec<String>,
    pub failures: Vec<SubjectFailure>,
    pub summary: ScanSummary,
    /// Sorted by person, then day.
    pub rows: Vec<DailyCount>,
    pub scan_duration: Duration,
}

impl Aggregate {
    pub fn total_count(&self) -> i64 {
        self.rows.iter().map(|row| row.file_count).sum()
    }

    pub fn status(&self) -> RunStatus {
        if self.failures.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithFailures(self.failures.len())
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub aggregate: Aggregate,
    pub rows_upserted: usize,
    pub persist_duration: Duration,
}

pub struct TallyEngine {
    config: AppConfig,
}

impl TallyEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Subject folders under the root, sorted by name.
    pub fn discover(&self) -> Result<Vec<SubjectFolder>, Error> {
        let filter = SubjectFilter::new(&self.config.subjects, &self.config.reserved_names);
        let mut subjects: Vec<SubjectFolder> = filter.subjects(&self.config.root_dir)?.collect();
        subjects.sort();
        Ok(subjects)
    }

    /// Validates the config, discovers subjects and walks them on a worker pool.
    pub fn aggregate(&self, reporter: &dyn ProgressReporter) -> Result<Aggregate, Error> {
        self.config.validate()?;

        let subjects = self.discover()?;
        let names: Vec<String> = subjects.iter().map(|s| s.name.clone()).collect();
        info!("Processing subjects: {:?}", names);
        reporter.on_discover_complete(&names);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|err| Error::InvalidConfig(format!("worker pool: {}", err)))?;

        let scan_start = Instant::now();
        let tally = DailyTally::new();
        let walker = FolderWalker::new(&self.config, reporter);

        let mut failures: Vec<SubjectFailure> = pool.install(|| {
            subjects
                .par_iter()
                .filter_map(|subject| {
                    debug!("Walking {}", subject.path.display());
                    match walker.walk_subject(subject, &tally) {
                        Ok(()) => None,
                        Err(err) => {
                            warn!("Subject {} failed: {}", subject.name, err);
                            reporter.on_subject_failed(&subject.name, &err.to_string());
                            Some(SubjectFailure {
                                subject: subject.name.clone(),
                                reason: err.to_string(),
                            })
                        }
                    }
                })
                .collect()
        });
        failures.sort_by(|a, b| a.subject.cmp(&b.subject));

        let summary = tally.summary();
        let scan_duration = scan_start.elapsed();
        reporter.on_scan_complete(&summary, scan_duration.as_secs_f64());
        info!(
            "Done scanning. Files scanned: {}. Errors: {}. Groups: {}",
            summary.files_scanned, summary.errors, summary.distinct_keys
        );

        Ok(Aggregate {
            subjects: names,
            failures,
            summary,
            rows: tally.into_rows(),
            scan_duration,
        })
    }

    /// Full run: DISCOVER -> AGGREGATE -> PERSIST. A store error fails the run
    /// and nothing from this run is committed.
    pub fn run(
        &self,
        store: &mut dyn CountStore,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunReport, Error> {
        let aggregate = self.aggregate(reporter)?;

        reporter.on_persist_start(aggregate.rows.len());
        let persist_start = Instant::now();
        let rows_upserted = store.upsert_counts(&aggregate.rows)?;
        let persist_duration = persist_start.elapsed();
        reporter.on_persist_complete(rows_upserted, persist_duration.as_secs_f64());
        info!("Upserted {} rows", rows_upserted);

        Ok(RunReport {
            aggregate,
            rows_upserted,
            persist_duration,
        })
    }
}
