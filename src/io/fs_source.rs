//! Directory source
//!
//! Scans one directory (non-recursively) and produces one row per regular,
//! non-hidden file with its path, raw bytes and timestamps.

use crate::common::constants::{
    SOURCE_CREATED_FIELD, SOURCE_DATA_FIELD, SOURCE_MODIFIED_FIELD, SOURCE_PATH_FIELD,
};
use crate::common::error::FlowError;
use crate::table::Table;
use crate::types::{Row, Value};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Result of a directory scan.
///
/// A scan never fails as a whole: entries that could not be read are left
/// out of `table` and reported in `failures`.
#[derive(Debug)]
pub struct DirectoryScan {
    pub table: Table,
    pub failures: Vec<FlowError>,
}

impl DirectoryScan {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reads every file of a directory into a table
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
    extension: Option<String>,
}

impl DirectorySource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            extension: None,
        }
    }

    /// Only keep files with this extension (without the dot)
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scan the directory. Entries are returned sorted by path.
    pub fn scan(&self) -> DirectoryScan {
        let mut failures = Vec::new();

        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read source directory");
                failures.push(source_error(&self.path, &e));
                return DirectoryScan {
                    table: Table::empty(),
                    failures,
                };
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "cannot list directory entry");
                    failures.push(source_error(&self.path, &e));
                }
            }
        }
        paths.sort();

        let mut rows = Vec::with_capacity(paths.len());
        for path in paths {
            if is_hidden(&path) || !self.matches_extension(&path) {
                continue;
            }
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot stat source entry");
                    failures.push(source_error(&path, &e));
                    continue;
                }
            };
            if !metadata.is_file() {
                debug!(path = %path.display(), "skipping non-file entry");
                continue;
            }
            match fs::read(&path) {
                Ok(data) => {
                    let mut row = Row::with_capacity(4);
                    row.insert(SOURCE_PATH_FIELD, path.to_string_lossy().into_owned());
                    row.insert(SOURCE_DATA_FIELD, Value::Blob(data));
                    row.insert(SOURCE_CREATED_FIELD, unix_seconds(metadata.created()));
                    row.insert(SOURCE_MODIFIED_FIELD, unix_seconds(metadata.modified()));
                    rows.push(row);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot read source entry");
                    failures.push(source_error(&path, &e));
                }
            }
        }

        info!(
            path = %self.path.display(),
            rows = rows.len(),
            failures = failures.len(),
            "directory scan complete"
        );
        DirectoryScan {
            table: Table::new(rows),
            failures,
        }
    }

    fn matches_extension(&self, path: &Path) -> bool {
        match &self.extension {
            None => true,
            Some(wanted) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted)),
        }
    }
}

/// Dotfiles such as `.DS_Store` are never source entries
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Scan `path` with no extension filter
pub fn read_directory(path: impl AsRef<Path>) -> DirectoryScan {
    DirectorySource::new(path).scan()
}

fn source_error(path: &Path, error: &std::io::Error) -> FlowError {
    FlowError::SourceRead {
        path: path.display().to_string(),
        reason: error.to_string(),
    }
}

/// Seconds since the epoch, 0 when the platform cannot report the time
fn unix_seconds(time: std::io::Result<SystemTime>) -> i64 {
    time.map(|t| DateTime::<Utc>::from(t).timestamp())
        .unwrap_or(0)
}
