//! Type system module
//!
//! This module contains the data model shared by every operator:
//! - Value: a single field value (scalars, bytes, lists, nested rows)
//! - Row: an ordered field-name-to-value mapping

pub mod row;
pub mod value;

// Re-export main types for convenience
pub use row::Row;
pub use value::Value;
