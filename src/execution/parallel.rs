//! Parallel execution settings
//!
//! Operators run single-threaded unless handed a context with more than one
//! thread. Only the similarity join fans out, over its left rows, using
//! Rayon's work-stealing pool.

use crate::common::constants::PARALLEL_JOIN_THRESHOLD;
use crate::common::error::{FlowError, FlowResult};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Parallel execution context
#[derive(Debug, Clone)]
pub struct ParallelContext {
    /// Number of worker threads
    pub num_threads: usize,
    /// Enable parallel execution
    pub parallel_enabled: bool,
    /// Minimum number of work items before fanning out
    pub min_items: usize,
}

impl ParallelContext {
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads,
            parallel_enabled: num_threads > 1,
            min_items: PARALLEL_JOIN_THRESHOLD,
        }
    }

    /// One worker per CPU
    pub fn from_system() -> Self {
        Self::new(num_cpus::get())
    }

    /// Sequential execution
    pub fn single_threaded() -> Self {
        Self::new(1)
    }

    pub fn with_min_items(mut self, min_items: usize) -> Self {
        self.min_items = min_items;
        self
    }

    /// Whether `items` units of work should be spread over the pool
    pub fn should_parallelize(&self, items: usize) -> bool {
        self.parallel_enabled && items >= self.min_items.max(2)
    }

    /// Build a dedicated pool with `num_threads` workers
    pub fn build_pool(&self) -> FlowResult<ThreadPool> {
        ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build()
            .map_err(|e| FlowError::Execution(format!("Failed to build thread pool: {}", e)))
    }
}

impl Default for ParallelContext {
    fn default() -> Self {
        Self::single_threaded()
    }
}
