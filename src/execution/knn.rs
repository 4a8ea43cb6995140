//! Brute-force top-k cosine-similarity join
//!
//! For each left row every right row is scored, so the cost is
//! O(|left| x |right| x dim). Right-side vectors and norms are computed once
//! and shared read-only by all left rows.

use crate::common::constants::SIMILARITY_EPSILON;
use crate::common::error::{FlowError, FlowResult};
use crate::execution::parallel::ParallelContext;
use crate::expression::Expression;
use crate::table::Table;
use crate::types::Row;
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Euclidean norm
pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity with precomputed norms.
///
/// Identical vectors score exactly 1.0; otherwise the norm product is padded
/// with [`SIMILARITY_EPSILON`] so zero vectors score 0.0.
pub fn cosine_similarity(a: &[f64], a_norm: f64, b: &[f64], b_norm: f64) -> f64 {
    if a == b {
        return 1.0;
    }
    dot(a, b) / (a_norm * b_norm + SIMILARITY_EPSILON)
}

/// Descending by score; NaN scores rank last
fn by_score_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[derive(Debug)]
struct CachedVector {
    values: Vec<f64>,
    norm: f64,
}

impl CachedVector {
    fn new(values: Vec<f64>) -> Self {
        let norm = norm(&values);
        Self { values, norm }
    }
}

/// Similarity join between two tables on vector-valued expressions
#[derive(Debug, Clone)]
pub struct KnnJoin {
    left_vector: Expression,
    right_vector: Expression,
    k: usize,
    right_prefix: Option<String>,
    parallel: ParallelContext,
}

impl KnnJoin {
    pub fn new(left_vector: Expression, right_vector: Expression, k: usize) -> Self {
        Self {
            left_vector,
            right_vector,
            k,
            right_prefix: None,
            parallel: ParallelContext::single_threaded(),
        }
    }

    /// Rename right-row fields to `"{prefix}_{field}"`
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.right_prefix = Some(prefix.into());
        self
    }

    pub fn with_parallelism(mut self, parallel: ParallelContext) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Run the join.
    ///
    /// Emits, for every left row in order, its `min(k, |right|)` best right
    /// rows by descending similarity. Ties keep the right table's order.
    pub fn execute(&self, left: &Table, right: &Table) -> FlowResult<Table> {
        info!(
            left_rows = left.len(),
            right_rows = right.len(),
            k = self.k,
            "starting similarity join"
        );

        if right.is_empty() || self.k == 0 || left.is_empty() {
            return Ok(Table::empty());
        }

        let cache = right
            .iter()
            .map(|row| {
                self.right_vector
                    .evaluate(row)?
                    .try_as_vector()
                    .map(CachedVector::new)
            })
            .collect::<FlowResult<Vec<_>>>()?;

        let dim = cache[0].values.len();
        if let Some(bad) = cache.iter().find(|c| c.values.len() != dim) {
            return Err(FlowError::InvalidArgument(format!(
                "Right vectors have inconsistent dimensions: {} and {}",
                dim,
                bad.values.len()
            )));
        }

        let matched: Vec<Vec<Row>> = if self.parallel.should_parallelize(left.len()) {
            debug!(threads = self.parallel.num_threads, "similarity join running in parallel");
            let pool = self.parallel.build_pool()?;
            pool.install(|| {
                left.rows()
                    .par_iter()
                    .map(|row| self.match_row(row, right, &cache, dim))
                    .collect::<FlowResult<Vec<_>>>()
            })?
        } else {
            let mut matched = Vec::with_capacity(left.len());
            for (i, row) in left.iter().enumerate() {
                if i % 100 == 0 {
                    debug!(processed = i, total = left.len(), "similarity join progress");
                }
                matched.push(self.match_row(row, right, &cache, dim)?);
            }
            matched
        };

        let out: Table = matched.into_iter().flatten().collect();
        info!(output_rows = out.len(), "similarity join complete");
        Ok(out)
    }

    fn match_row(
        &self,
        left_row: &Row,
        right: &Table,
        cache: &[CachedVector],
        dim: usize,
    ) -> FlowResult<Vec<Row>> {
        let values = self.left_vector.evaluate(left_row)?.try_as_vector()?;
        if values.len() != dim {
            return Err(FlowError::InvalidArgument(format!(
                "Left vector has dimension {}, right vectors have {}",
                values.len(),
                dim
            )));
        }
        let left_norm = norm(&values);

        let mut scored: Vec<(f64, usize)> = cache
            .iter()
            .enumerate()
            .map(|(idx, c)| (cosine_similarity(&values, left_norm, &c.values, c.norm), idx))
            .collect();
        // sort_by is stable, so equal scores keep right-table order
        scored.sort_by(|a, b| by_score_desc(a.0, b.0));
        scored.truncate(self.k);

        Ok(scored
            .into_iter()
            .map(|(_, idx)| self.merge(left_row, &right.rows()[idx]))
            .collect())
    }

    fn merge(&self, left_row: &Row, right_row: &Row) -> Row {
        let mut merged = left_row.clone();
        for (name, value) in right_row.iter() {
            let name = match &self.right_prefix {
                Some(prefix) => format!("{}_{}", prefix, name),
                None => name.to_string(),
            };
            merged.insert(name, value.clone());
        }
        merged
    }
}
