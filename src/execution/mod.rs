//! Join execution
//!
//! The similarity join is the only operator with non-trivial cost; it lives
//! here together with the parallelism settings it can use.

pub mod knn;
pub mod parallel;

pub use knn::{cosine_similarity, dot, norm, KnnJoin};
pub use parallel::ParallelContext;
