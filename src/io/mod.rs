//! One-shot input/output adapters
//!
//! A directory source that turns files into rows and a delimited-text sink
//! that writes a table out.

pub mod csv_sink;
pub mod fs_source;

pub use csv_sink::{write_csv, CsvSink};
pub use fs_source::{read_directory, DirectoryScan, DirectorySource};
