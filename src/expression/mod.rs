//! Expression system
//!
//! This module provides the symbolic expressions evaluated against rows:
//! field references, bound function application, method calls, equality,
//! tuples and literals.

pub mod expression;
pub mod function;
pub mod method;

pub use expression::*;
pub use function::*;
pub use method::call_method;
