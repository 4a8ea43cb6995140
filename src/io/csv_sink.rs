//! Delimited-text sink

use crate::common::error::FlowResult;
use crate::table::Table;
use csv::WriterBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes a table to a delimited file with a header line.
///
/// The header is taken from the first row's field names, in order; every
/// other row is written against that header, missing fields as empty cells.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    delimiter: u8,
}

impl CsvSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `table`, returning the number of data rows written.
    ///
    /// An empty table is a no-op: nothing is created on disk.
    pub fn write(&self, table: &Table) -> FlowResult<usize> {
        let Some(first) = table.rows().first() else {
            debug!(path = %self.path.display(), "empty table, skipping write");
            return Ok(0);
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let header: Vec<&str> = first.field_names().collect();
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&self.path)?;
        writer.write_record(&header)?;

        for row in table.iter() {
            let record = header
                .iter()
                .map(|name| row.get(name).map(|value| value.to_cell()).unwrap_or_default());
            writer.write_record(record)?;
        }
        writer.flush()?;

        info!(path = %self.path.display(), rows = table.len(), "wrote csv output");
        Ok(table.len())
    }
}

/// Write `table` as comma-separated text to `path`
pub fn write_csv(table: &Table, path: impl AsRef<Path>) -> FlowResult<usize> {
    CsvSink::new(path).write(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use crate::types::Value;
    use tempfile::tempdir;

    #[test]
    fn test_write_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("results.csv");
        let table = Table::new(vec![
            row! { "story_id" => "1", "prediction" => 1, "rationale" => "fine, really" },
            row! { "story_id" => "2", "prediction" => 0, "rationale" => Value::Null },
        ]);

        let written = write_csv(&table, &path).unwrap();
        assert_eq!(written, 2);
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "story_id,prediction,rationale\n1,1,\"fine, really\"\n2,0,\n"
        );
    }

    #[test]
    fn test_empty_table_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nothing.csv");
        assert_eq!(write_csv(&Table::empty(), &path).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_field_and_delimiter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tabs.tsv");
        let table = Table::new(vec![
            row! { "a" => 1, "b" => vec![1.5, 2.0] },
            row! { "a" => 2 },
        ]);
        CsvSink::new(&path).with_delimiter(b'\t').write(&table).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "a\tb\n1\t[1.5,2.0]\n2\t\n");
    }
}
