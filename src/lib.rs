//! claimflow - eager dataflow over row tables
//!
//! Symbolic column expressions are evaluated row by row over immutable
//! tables. Tables support projection, flattening, filtering, grouped
//! reduction and a brute-force top-k cosine-similarity join. On top of the
//! engine, [`verification`] checks character backstories against novels.
//!
//! ```
//! use claimflow::{col, lit, row, Table};
//!
//! let t = Table::new(vec![row! { "n" => 1 }, row! { "n" => 2 }]);
//! let two = t.filter(&col("n").eq(lit(2))).unwrap();
//! assert_eq!(two.len(), 1);
//! ```

pub mod common;
pub mod config;
pub mod execution;
pub mod expression;
pub mod io;
pub mod llm;
pub mod table;
pub mod types;
pub mod verification;

// Re-export common types for convenience
pub use common::{FlowError, FlowResult};

pub use config::{LlmConfig, PipelineConfig, Provider};

pub use types::{Row, Value};

pub use expression::{apply, col, lit, tuple, ColumnRef, Expression, ScalarFunction};

pub use table::{GroupedTable, Reducer, Table};

pub use execution::{KnnJoin, ParallelContext};

pub use io::{CsvSink, DirectoryScan, DirectorySource};
