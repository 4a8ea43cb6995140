//! Tables and their operators
//!
//! Every operator consumes its whole input eagerly and returns a new table;
//! input tables are never mutated.

pub mod grouped;
pub mod reducer;
#[allow(clippy::module_inception)]
pub mod table;

pub use grouped::{GroupKey, GroupedTable};
pub use reducer::{Reducer, ReducerKind, ReducerState};
pub use table::Table;
