use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A top-level folder holding one person's archive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubjectFolder {
    pub name: String,
    pub path: PathBuf,
}

pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Decides which immediate children of the root are subject folders.
#[derive(Debug, Clone)]
pub struct SubjectFilter {
    allowed: HashSet<String>,
    reserved: HashSet<String>,
}

impl SubjectFilter {
    pub fn new(allowed: &[String], reserved: &[String]) -> Self {
        Self {
            allowed: allowed.iter().cloned().collect(),
            reserved: reserved.iter().cloned().collect(),
        }
    }

    /// Name rules only: not hidden, no space or underscore, not reserved, allow-listed.
    pub fn accepts(&self, name: &str) -> bool {
        !is_hidden(name)
            && !name.contains(' ')
            && !name.contains('_')
            && !self.reserved.contains(name)
            && self.allowed.contains(name)
    }

    /// Lazily yields accepted directories under `root`. Each call re-reads the root.
    /// Fails only when the root itself cannot be listed.
    pub fn subjects<'a>(
        &'a self,
        root: &Path,
    ) -> io::Result<impl Iterator<Item = SubjectFolder> + 'a> {
        let entries = fs::read_dir(root).map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Error reading root directory {}: {}", root.display(), err),
            )
        })?;

        Ok(entries.filter_map(move |entry_result| {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable root entry: {}", err);
                    return None;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if !self.accepts(&name) {
                return None;
            }
            // Symlinked subject folders are followed here; the walk below never follows links.
            let path = entry.path();
            if !path.is_dir() {
                return None;
            }
            Some(SubjectFolder { name, path })
        }))
    }
}
