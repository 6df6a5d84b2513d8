use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::fs;
use std::io;
use std::path::Path;

use crate::config::{ClockOffset, TimestampField};

/// Reads one file timestamp and applies the configured clock correction.
#[derive(Debug, Clone, Copy)]
pub struct TimestampProvider {
    field: TimestampField,
    /// `None` when the configured offset is unrepresentable; every read then fails.
    offset: Option<TimeDelta>,
}

impl TimestampProvider {
    pub fn new(field: TimestampField, offset: ClockOffset) -> Self {
        Self {
            field,
            offset: offset.as_delta(),
        }
    }

    /// Corrected instant for `path`. Follows symlinks, so a dangling link is an error.
    /// A correction that leaves chrono's date range is an error too.
    pub fn corrected(&self, path: &Path) -> io::Result<DateTime<Utc>> {
        let metadata = fs::metadata(path)?;
        let raw = match self.field {
            TimestampField::Created => metadata.created()?,
            TimestampField::Modified => metadata.modified()?,
        };
        self.offset
            .and_then(|offset| DateTime::<Utc>::from(raw).checked_add_signed(offset))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("corrected timestamp of {} is out of range", path.display()),
                )
            })
    }

    /// Calendar day (UTC) of the corrected timestamp.
    pub fn corrected_day(&self, path: &Path) -> io::Result<NaiveDate> {
        self.corrected(path).map(|instant| instant.date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::tempdir;

    fn ts(rfc3339: &str) -> i64 {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().timestamp()
    }

    #[test]
    fn test_modified_without_offset() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, "a").unwrap();
        set_file_mtime(&file, FileTime::from_unix_time(ts("2024-03-05T10:00:00Z"), 0)).unwrap();

        let provider = TimestampProvider::new(TimestampField::Modified, ClockOffset::default());
        assert_eq!(
            provider.corrected_day(&file).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
    }

    #[test]
    fn test_offset_can_roll_the_day() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, "a").unwrap();
        set_file_mtime(&file, FileTime::from_unix_time(ts("2024-03-05T23:30:00Z"), 0)).unwrap();

        let provider = TimestampProvider::new(
            TimestampField::Modified,
            ClockOffset {
                days: 1,
                minutes: 45,
            },
        );
        assert_eq!(
            provider.corrected(&file).unwrap(),
            DateTime::parse_from_rfc3339("2024-03-07T00:15:00Z").unwrap()
        );
        assert_eq!(
            provider.corrected_day(&file).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
        );
    }

    #[test]
    fn test_negative_offset() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, "a").unwrap();
        set_file_mtime(&file, FileTime::from_unix_time(ts("2024-03-05T00:10:00Z"), 0)).unwrap();

        let provider = TimestampProvider::new(
            TimestampField::Modified,
            ClockOffset {
                days: 0,
                minutes: -20,
            },
        );
        assert_eq!(
            provider.corrected_day(&file).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
    }

    #[test]
    fn test_overflowing_offset_is_an_error_not_a_panic() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, "a").unwrap();

        let provider = TimestampProvider::new(
            TimestampField::Modified,
            ClockOffset {
                days: 1_000_000_000,
                minutes: 0,
            },
        );
        let err = provider.corrected_day(&file).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let unrepresentable = TimestampProvider::new(
            TimestampField::Modified,
            ClockOffset {
                days: i64::MAX,
                minutes: 0,
            },
        );
        assert!(unrepresentable.corrected(&file).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let provider = TimestampProvider::new(TimestampField::Modified, ClockOffset::default());
        assert!(provider.corrected(&tmp.path().join("gone.txt")).is_err());
    }
}
