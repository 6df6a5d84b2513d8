use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::batch::{BatchDetector, BatchOutcome, ListedFile};
use super::subjects::{is_hidden, SubjectFolder};
use super::timestamp::TimestampProvider;
use crate::config::{AppConfig, DateWindow};
use crate::progress::ProgressReporter;
use crate::tally::{DailyTally, DayKey};

/// Result of evaluating one file on its own.
#[derive(Debug)]
pub enum FileOutcome {
    Counted(NaiveDate),
    OutOfWindow(NaiveDate),
    Unreadable(io::Error),
}

/// Entries of one directory, hidden names removed, sorted by name.
#[derive(Debug, Default)]
pub struct DirListing {
    pub files: Vec<ListedFile>,
    pub subdirs: Vec<PathBuf>,
}

/// Lists `dir` once. Symlinks to directories are neither followed nor counted;
/// other symlinks (dangling ones included) are treated as files.
pub fn list_directory(dir: &Path) -> io::Result<(DirListing, usize)> {
    let mut listing = DirListing::default();
    let mut entry_errors = 0;

    for entry_result in fs::read_dir(dir)? {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Error reading entry in directory {}: {}", dir.display(), err);
                entry_errors += 1;
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) {
            continue;
        }
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!("Error getting file type for {}: {}", path.display(), err);
                entry_errors += 1;
                continue;
            }
        };

        if file_type.is_dir() {
            listing.subdirs.push(path);
        } else if file_type.is_symlink() && fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false) {
            debug!("Not following directory link {}", path.display());
        } else {
            listing.files.push(ListedFile { name, path });
        }
    }

    listing.files.sort_by(|a, b| a.name.cmp(&b.name));
    listing.subdirs.sort();
    Ok((listing, entry_errors))
}

/// Walks one subject tree and feeds its counts into a shared [`DailyTally`].
pub struct FolderWalker<'a> {
    detector: BatchDetector,
    timestamps: TimestampProvider,
    window: DateWindow,
    progress_every: usize,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> FolderWalker<'a> {
    pub fn new(config: &AppConfig, reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            detector: BatchDetector::new(&config.batch),
            timestamps: TimestampProvider::new(config.timestamp_field, config.clock_offset),
            window: config.window(),
            progress_every: config.progress_every.max(1),
            reporter,
        }
    }

    pub fn evaluate_file(&self, path: &Path) -> FileOutcome {
        match self.timestamps.corrected_day(path) {
            Ok(day) if self.window.contains(day) => FileOutcome::Counted(day),
            Ok(day) => FileOutcome::OutOfWindow(day),
            Err(err) => FileOutcome::Unreadable(err),
        }
    }

    /// Visits every non-hidden directory under the subject once.
    /// Fails only when the subject folder itself cannot be listed.
    pub fn walk_subject(&self, subject: &SubjectFolder, tally: &DailyTally) -> io::Result<()> {
        let (root_listing, root_errors) = list_directory(&subject.path).map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Error reading subject folder {}: {}", subject.path.display(), err),
            )
        })?;
        for _ in 0..root_errors {
            tally.file_error();
        }

        let mut pending: Vec<(PathBuf, DirListing)> = vec![(subject.path.clone(), root_listing)];
        while let Some((dir, listing)) = pending.pop() {
            self.process_directory(subject, &dir, &listing.files, tally);

            // Reverse so the stack pops subdirectories in name order.
            for subdir in listing.subdirs.into_iter().rev() {
                match list_directory(&subdir) {
                    Ok((sub_listing, entry_errors)) => {
                        for _ in 0..entry_errors {
                            tally.file_error();
                        }
                        pending.push((subdir, sub_listing));
                    }
                    Err(err) => {
                        warn!("Error reading directory {}: {}", subdir.display(), err);
                        tally.directory_error();
                    }
                }
            }
        }
        Ok(())
    }

    fn process_directory(
        &self,
        subject: &SubjectFolder,
        dir: &Path,
        files: &[ListedFile],
        tally: &DailyTally,
    ) {
        match self.detector.evaluate(files, &self.timestamps, &self.window) {
            BatchOutcome::Counted { day, weight } => {
                tally.add(DayKey::new(subject.name.clone(), day), weight);
                tally.batch_counted();
                return;
            }
            BatchOutcome::Omitted => {
                tally.batch_omitted();
                return;
            }
            BatchOutcome::NotBatch => {}
        }

        for file in files {
            let scanned = tally.file_scanned();
            if scanned % self.progress_every == 0 {
                self.reporter.on_scan_progress(
                    scanned,
                    tally.errors(),
                    &subject.name,
                    &dir.to_string_lossy(),
                );
            }

            match self.evaluate_file(&file.path) {
                FileOutcome::Counted(day) => tally.add(DayKey::new(subject.name.clone(), day), 1),
                FileOutcome::OutOfWindow(_) => tally.file_out_of_window(),
                FileOutcome::Unreadable(err) => {
                    debug!("Error reading timestamp for {}: {}", file.path.display(), err);
                    tally.file_error();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimestampField;
    use crate::progress::SilentReporter;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::tempdir;

    // 2024-03-05T12:00:00Z
    const MARCH_5: i64 = 1_709_640_000;

    fn touch(path: &Path, unix: i64) {
        fs::write(path, "x").unwrap();
        set_file_mtime(path, FileTime::from_unix_time(unix, 0)).unwrap();
    }

    fn config(root: &Path) -> AppConfig {
        let mut config = AppConfig::new(root, &["Kelly"]);
        config.timestamp_field = TimestampField::Modified;
        config
    }

    #[test]
    fn test_list_directory_skips_hidden_and_sorts() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("b.txt"), "b").unwrap();
        fs::write(dir.join("a.txt"), "a").unwrap();
        fs::write(dir.join(".hidden"), "h").unwrap();
        fs::create_dir(dir.join("sub")).unwrap();
        fs::create_dir(dir.join(".git")).unwrap();

        let (listing, errors) = list_directory(dir).unwrap();
        assert_eq!(errors, 0);
        let names: Vec<&str> = listing.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(listing.subdirs, vec![dir.join("sub")]);
    }

    #[test]
    fn test_walk_counts_nested_files_and_skips_hidden_dirs() {
        let tmp = tempdir().unwrap();
        let kelly = tmp.path().join("Kelly");
        fs::create_dir_all(kelly.join("a/b")).unwrap();
        fs::create_dir_all(kelly.join(".cache")).unwrap();
        touch(&kelly.join("top.txt"), MARCH_5);
        touch(&kelly.join("a/one.txt"), MARCH_5);
        touch(&kelly.join("a/b/two.txt"), MARCH_5);
        touch(&kelly.join(".cache/ignored.txt"), MARCH_5);
        touch(&kelly.join("a/.ignored.txt"), MARCH_5);

        let config = config(tmp.path());
        let walker = FolderWalker::new(&config, &SilentReporter);
        let tally = DailyTally::new();
        let subject = SubjectFolder {
            name: "Kelly".to_string(),
            path: kelly,
        };
        walker.walk_subject(&subject, &tally).unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(tally.get(&DayKey::new("Kelly", day)), Some(3));
        assert_eq!(tally.summary().files_scanned, 3);
    }

    #[test]
    fn test_missing_subject_folder_is_an_error() {
        let tmp = tempdir().unwrap();
        let config = config(tmp.path());
        let walker = FolderWalker::new(&config, &SilentReporter);
        let subject = SubjectFolder {
            name: "Kelly".to_string(),
            path: tmp.path().join("Kelly"),
        };
        assert!(walker.walk_subject(&subject, &DailyTally::new()).is_err());
    }

    #[test]
    fn test_evaluate_file_outcomes() {
        let tmp = tempdir().unwrap();
        let config = config(tmp.path());
        let walker = FolderWalker::new(&config, &SilentReporter);

        let inside = tmp.path().join("inside.txt");
        touch(&inside, MARCH_5);
        assert!(matches!(walker.evaluate_file(&inside), FileOutcome::Counted(_)));

        let old = tmp.path().join("old.txt");
        // 2010-01-01T00:00:00Z
        touch(&old, 1_262_304_000);
        assert!(matches!(walker.evaluate_file(&old), FileOutcome::OutOfWindow(_)));

        assert!(matches!(
            walker.evaluate_file(&tmp.path().join("missing.txt")),
            FileOutcome::Unreadable(_)
        ));
    }
}
