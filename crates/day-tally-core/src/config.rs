use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::error::Error;

/// Which file timestamp is attributed to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampField {
    #[default]
    Created,
    Modified,
}

/// Fixed correction added to every raw timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClockOffset {
    pub days: i64,
    pub minutes: i64,
}

impl ClockOffset {
    /// `None` when the offset does not fit in a `TimeDelta`.
    pub fn as_delta(&self) -> Option<TimeDelta> {
        TimeDelta::try_days(self.days)?.checked_add(&TimeDelta::try_minutes(self.minutes)?)
    }
}

/// Bulk-export detection knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatchRules {
    /// Characters dropped from the end of a file stem to form its batch identity.
    pub suffix_len: usize,
    /// Group size at which a directory counts as a single bulk export.
    pub group_threshold: usize,
    /// Synthetic count contributed by one bulk export.
    pub weight: u64,
}

impl Default for BatchRules {
    fn default() -> Self {
        Self {
            suffix_len: 9,
            group_threshold: 40,
            weight: 5,
        }
    }
}

/// Half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Required; may come from the CLI instead of the config file.
    #[serde(default)]
    pub root_dir: PathBuf,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default = "default_reserved_names")]
    pub reserved_names: Vec<String>,
    #[serde(default)]
    pub timestamp_field: TimestampField,
    #[serde(default)]
    pub clock_offset: ClockOffset,
    #[serde(default = "default_window_start")]
    pub window_start: NaiveDate,
    #[serde(default = "default_window_end")]
    pub window_end: NaiveDate,
    #[serde(default)]
    pub batch: BatchRules,
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
    /// Worker threads for the folder walk; 0 lets rayon pick.
    #[serde(default)]
    pub workers: usize,
    #[serde(default)]
    pub database_url: Option<String>,
}

fn default_reserved_names() -> Vec<String> {
    vec!["Website".to_string()]
}

fn default_window_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

fn default_window_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default()
}

fn default_progress_every() -> usize {
    200
}

pub const DEFAULT_DATABASE_URL: &str = "day_tally.db";

impl AppConfig {
    /// Minimal config for a root directory and allow-list; everything else defaulted.
    pub fn new(root_dir: impl Into<PathBuf>, subjects: &[&str]) -> Self {
        Self {
            root_dir: root_dir.into(),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            reserved_names: default_reserved_names(),
            timestamp_field: TimestampField::default(),
            clock_offset: ClockOffset::default(),
            window_start: default_window_start(),
            window_end: default_window_end(),
            batch: BatchRules::default(),
            progress_every: default_progress_every(),
            workers: 0,
            database_url: None,
        }
    }

    pub fn window(&self) -> DateWindow {
        DateWindow {
            start: self.window_start,
            end: self.window_end,
        }
    }

    /// Store location: explicit setting, then `DATABASE_URL`, then a local SQLite file.
    pub fn resolved_database_url(&self) -> String {
        self.database_url
            .clone()
            .or_else(|| env::var("DATABASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.window_start >= self.window_end {
            return Err(Error::InvalidConfig(format!(
                "window_start {} must be before window_end {}",
                self.window_start, self.window_end
            )));
        }
        let offset_in_range = self
            .clock_offset
            .as_delta()
            .and_then(|delta| DateTime::<Utc>::from_timestamp(0, 0)?.checked_add_signed(delta))
            .is_some();
        if !offset_in_range {
            return Err(Error::InvalidConfig(format!(
                "clock_offset of {} days {} minutes is out of range",
                self.clock_offset.days, self.clock_offset.minutes
            )));
        }
        if self.batch.group_threshold == 0 {
            return Err(Error::InvalidConfig(
                "batch.group_threshold must be at least 1".to_string(),
            ));
        }
        if self.progress_every == 0 {
            return Err(Error::InvalidConfig(
                "progress_every must be at least 1".to_string(),
            ));
        }
        if self.root_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("root_dir is not set".to_string()));
        }
        let metadata = fs::metadata(&self.root_dir).map_err(|err| {
            Error::InvalidConfig(format!(
                "root_dir {} is not readable: {}",
                self.root_dir.display(),
                err
            ))
        })?;
        if !metadata.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "root_dir {} is not a directory",
                self.root_dir.display()
            )));
        }
        Ok(())
    }
}

/// Reads `Tally.toml` (optional) and `TALLY__*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, Error> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Tally").required(false))
        .add_source(
            Environment::with_prefix("TALLY")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("subjects")
                .with_list_parse_key("reserved_names")
                .try_parsing(true),
        )
        .build()?;
    Ok(builder.try_deserialize::<AppConfig>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_window_is_half_open() {
        let window = DateWindow {
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        };
        assert!(window.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        assert!(window.contains(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        assert!(!window.contains(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
        assert!(!window.contains(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
    }

    #[test]
    fn test_clock_offset_delta() {
        let offset = ClockOffset {
            days: 1122,
            minutes: 1309,
        };
        assert_eq!(
            offset.as_delta().unwrap().num_minutes(),
            1122 * 24 * 60 + 1309
        );
        assert_eq!(ClockOffset::default().as_delta(), Some(TimeDelta::zero()));
        let unrepresentable = ClockOffset {
            days: i64::MAX,
            minutes: 0,
        };
        assert_eq!(unrepresentable.as_delta(), None);
    }

    #[test]
    fn test_defaults_match_reference_behaviour() {
        let config = AppConfig::new("/tmp", &["Kelly"]);
        assert_eq!(config.batch.suffix_len, 9);
        assert_eq!(config.batch.group_threshold, 40);
        assert_eq!(config.batch.weight, 5);
        assert_eq!(config.progress_every, 200);
        assert_eq!(config.reserved_names, vec!["Website".to_string()]);
        assert_eq!(config.timestamp_field, TimestampField::Created);
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let tmp = tempdir().unwrap();
        let mut config = AppConfig::new(tmp.path(), &[]);
        config.window_start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        config.window_end = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_huge_clock_offset() {
        let tmp = tempdir().unwrap();
        let mut config = AppConfig::new(tmp.path(), &[]);
        config.clock_offset.days = 1_000_000_000;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config.clock_offset = ClockOffset {
            days: 0,
            minutes: i64::MIN,
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config.clock_offset = ClockOffset {
            days: 1122,
            minutes: 1309,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_root() {
        let tmp = tempdir().unwrap();
        let config = AppConfig::new(tmp.path().join("nope"), &[]);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let ok = AppConfig::new(tmp.path(), &[]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let raw = r#"
            root_dir = "/srv/archive"
            subjects = ["Kelly", "Diana"]
            timestamp_field = "modified"
            window_start = "2024-01-01"

            [clock_offset]
            minutes = 30

            [batch]
            group_threshold = 10
        "#;
        let config: AppConfig = Config::builder()
            .add_source(ConfigFile::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.subjects, vec!["Kelly", "Diana"]);
        assert_eq!(config.timestamp_field, TimestampField::Modified);
        assert_eq!(config.clock_offset, ClockOffset { days: 0, minutes: 30 });
        assert_eq!(config.batch.group_threshold, 10);
        assert_eq!(config.batch.suffix_len, 9);
        assert_eq!(config.window_end, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }
}
