use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use super::timestamp::TimestampProvider;
use crate::config::{BatchRules, DateWindow};

/// Splits `name` into stem and extension the way a dotfile-aware splitter would:
/// the extension starts at the last dot unless everything before it is dots.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Maps a file name to its batch identity by dropping a fixed-length stem suffix.
#[derive(Debug, Clone, Copy)]
pub struct NameCollapser {
    suffix_len: usize,
}

impl NameCollapser {
    pub fn new(suffix_len: usize) -> Self {
        Self { suffix_len }
    }

    pub fn collapse(&self, name: &str) -> String {
        let (stem, ext) = split_extension(name);
        let stem_len = stem.chars().count();
        if stem_len <= self.suffix_len {
            return name.to_string();
        }
        let keep = stem_len - self.suffix_len;
        let cut = stem
            .char_indices()
            .nth(keep)
            .map(|(idx, _)| idx)
            .unwrap_or(stem.len());
        format!("{}{}", &stem[..cut], ext)
    }
}

/// A non-hidden file listed directly inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub name: String,
    pub path: PathBuf,
}

impl ListedFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// A collapsed identity that reached the threshold inside one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchGroup<'a> {
    pub identity: String,
    pub members: usize,
    /// First member in listing order.
    pub representative: &'a ListedFile,
}

/// What the batch rule decided for one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// No group reached the threshold; count files one by one.
    NotBatch,
    /// Bulk export attributed to `day` with the synthetic weight.
    Counted { day: NaiveDate, weight: u64 },
    /// Bulk export whose representative was unreadable or outside the window.
    Omitted,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchDetector {
    collapser: NameCollapser,
    threshold: usize,
    weight: u64,
}

impl BatchDetector {
    pub fn new(rules: &BatchRules) -> Self {
        Self {
            collapser: NameCollapser::new(rules.suffix_len),
            threshold: rules.group_threshold,
            weight: rules.weight,
        }
    }

    /// First group (by first appearance in `files`) whose size reaches the threshold.
    pub fn find_group<'a>(&self, files: &'a [ListedFile]) -> Option<BatchGroup<'a>> {
        let mut groups: HashMap<String, (usize, usize)> = HashMap::new();
        for (idx, file) in files.iter().enumerate() {
            let entry = groups
                .entry(self.collapser.collapse(&file.name))
                .or_insert((0, idx));
            entry.0 += 1;
        }

        groups
            .into_iter()
            .filter(|(_, (count, _))| *count >= self.threshold)
            .min_by_key(|(_, (_, first))| *first)
            .map(|(identity, (members, first))| BatchGroup {
                identity,
                members,
                representative: &files[first],
            })
    }

    /// Applies the batch rule to the files listed directly in one directory.
    pub fn evaluate(
        &self,
        files: &[ListedFile],
        timestamps: &TimestampProvider,
        window: &DateWindow,
    ) -> BatchOutcome {
        let group = match self.find_group(files) {
            Some(group) => group,
            None => return BatchOutcome::NotBatch,
        };
        let rep = group.representative;
        let dir = rep.path.parent().unwrap_or(&rep.path);

        match timestamps.corrected_day(&rep.path) {
            Ok(day) if window.contains(day) => {
                debug!(
                    "Batch directory {} ({} x {}) counted on {}",
                    dir.display(),
                    group.members,
                    group.identity,
                    day
                );
                BatchOutcome::Counted {
                    day,
                    weight: self.weight,
                }
            }
            Ok(day) => {
                debug!(
                    "Batch directory {} dated {} is outside the window",
                    dir.display(),
                    day
                );
                BatchOutcome::Omitted
            }
            Err(err) => {
                debug!(
                    "Batch directory {} representative {} unreadable: {}",
                    dir.display(),
                    rep.name,
                    err
                );
                BatchOutcome::Omitted
            }
        }
    }
}
