//! Immutable row tables and their transformation operators

use crate::common::error::{FlowError, FlowResult};
use crate::execution::knn::KnnJoin;
use crate::expression::Expression;
use crate::table::grouped::GroupedTable;
use crate::types::{Row, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// An ordered, immutable sequence of rows.
///
/// Rows are shared behind an `Arc`, so cloning a table is cheap and every
/// operator returns a freshly built table without touching its input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Arc<Vec<Row>>,
}

impl Table {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Arc::new(rows),
        }
    }

    /// Create a table with no rows
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Union of field names across all rows, in first-seen order
    pub fn field_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for row in self.rows.iter() {
            for name in row.field_names() {
                if seen.insert(name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    /// Values of one expression over every row, in row order
    pub fn column(&self, expr: &Expression) -> FlowResult<Vec<Value>> {
        self.rows.iter().map(|row| expr.evaluate(row)).collect()
    }

    /// Project every row onto the given `(name, expression)` pairs.
    ///
    /// Output rows contain exactly the given names, in the given order. The
    /// output has the same row count and order as the input.
    pub fn select<I, S>(&self, projections: I) -> FlowResult<Table>
    where
        I: IntoIterator<Item = (S, Expression)>,
        S: Into<String>,
    {
        let projections: Vec<(String, Expression)> = projections
            .into_iter()
            .map(|(name, expr)| (name.into(), expr))
            .collect();

        let mut names = HashSet::with_capacity(projections.len());
        for (name, _) in &projections {
            if !names.insert(name.as_str()) {
                return Err(FlowError::InvalidArgument(format!(
                    "Duplicate output field '{}' in select",
                    name
                )));
            }
        }

        let mut out = Vec::with_capacity(self.len());
        for row in self.rows.iter() {
            let mut projected = Row::with_capacity(projections.len());
            for (name, expr) in &projections {
                projected.insert(name.clone(), expr.evaluate(row)?);
            }
            out.push(projected);
        }
        Ok(Table::new(out))
    }

    /// Explode a list-valued field into one row per element.
    ///
    /// `target` must be a field reference. Each output row is a copy of its
    /// source row with the target field replaced by one list element, in list
    /// order. Rows whose target is not a list are skipped.
    pub fn flatten(&self, target: &Expression) -> FlowResult<Table> {
        let column = target.as_column().ok_or_else(|| {
            FlowError::InvalidArgument(format!(
                "flatten requires a field reference, got {}",
                target
            ))
        })?;

        let name = column.name();
        let mut out = Vec::with_capacity(self.len());
        let mut skipped = 0usize;
        for row in self.rows.iter() {
            match target.evaluate(row)? {
                Value::List(items) => {
                    for item in items {
                        let mut exploded = row.clone();
                        // write back to whichever field resolution read from
                        if row.contains(&name) {
                            exploded.insert(name.clone(), item);
                        } else {
                            exploded.set_path(column.segments(), item);
                        }
                        out.push(exploded);
                    }
                }
                other => {
                    skipped += 1;
                    debug!(
                        field = %name,
                        value_type = other.type_name(),
                        "flatten skipped row whose target is not a list"
                    );
                }
            }
        }
        debug!(input = self.len(), output = out.len(), skipped, "flatten complete");
        Ok(Table::new(out))
    }

    /// Keep, in order, the rows for which `predicate` is truthy
    pub fn filter(&self, predicate: &Expression) -> FlowResult<Table> {
        let mut out = Vec::new();
        for row in self.rows.iter() {
            if predicate.evaluate(row)?.is_truthy() {
                out.push(row.clone());
            }
        }
        Ok(Table::new(out))
    }

    /// Start a grouped reduction over the given key expressions.
    ///
    /// With no keys every row belongs to one global group.
    pub fn groupby(&self, keys: Vec<Expression>) -> FlowResult<GroupedTable> {
        GroupedTable::new(self.clone(), keys)
    }

    /// Top-`k` cosine-similarity join against `right`.
    ///
    /// Right-row fields are renamed `"{prefix}_{field}"` when a prefix is given.
    pub fn knn_join(
        &self,
        right: &Table,
        left_vector: Expression,
        right_vector: Expression,
        k: usize,
        right_prefix: Option<&str>,
    ) -> FlowResult<Table> {
        let mut join = KnnJoin::new(left_vector, right_vector, k);
        if let Some(prefix) = right_prefix {
            join = join.with_prefix(prefix);
        }
        join.execute(self, right)
    }

    /// Concatenate two tables, rows of `self` first
    pub fn concat(&self, other: &Table) -> Table {
        let mut rows = Vec::with_capacity(self.len() + other.len());
        rows.extend(self.rows.iter().cloned());
        rows.extend(other.rows.iter().cloned());
        Table::new(rows)
    }
}

impl From<Vec<Row>> for Table {
    fn from(rows: Vec<Row>) -> Self {
        Table::new(rows)
    }
}

impl FromIterator<Row> for Table {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Table::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{apply, col, lit, ScalarFunction};
    use crate::row;
    use pretty_assertions::assert_eq;

    fn people() -> Table {
        Table::new(vec![
            row! { "name" => "ada", "tags" => vec!["x".to_string(), "y".to_string()], "age" => 36 },
            row! { "name" => "bob", "tags" => Vec::<String>::new(), "age" => 17 },
            row! { "name" => "cy", "tags" => vec!["z".to_string()], "age" => 52 },
        ])
    }

    #[test]
    fn test_select_shape() {
        let t = people();
        let out = t
            .select([("who", col("name")), ("years", col("age")), ("none", col("nope"))])
            .unwrap();
        assert_eq!(out.len(), t.len());
        for row in &out {
            assert_eq!(row.field_names().collect::<Vec<_>>(), vec!["who", "years", "none"]);
            assert_eq!(row.get("none"), Some(&Value::Null));
        }
        assert_eq!(out.rows()[2].get("who"), Some(&Value::varchar("cy")));
    }

    #[test]
    fn test_select_rejects_duplicate_names() {
        let err = people()
            .select([("a", col("name")), ("a", col("age"))])
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidArgument(_)));
    }

    #[test]
    fn test_select_does_not_mutate_input() {
        let t = people();
        let before = t.clone();
        let _ = t.select([("n", col("name"))]).unwrap();
        assert_eq!(t, before);
        assert_eq!(t.rows()[0].len(), 3);
    }

    #[test]
    fn test_select_propagates_row_errors() {
        let t = people();
        let err = t
            .select([("bad", col("age").method("decode", vec![]))])
            .unwrap_err();
        assert!(matches!(err, FlowError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_flatten_order_and_fields() {
        let out = people().flatten(&col("tags")).unwrap();
        let names: Vec<_> = out.iter().map(|r| r.get("name").unwrap().clone()).collect();
        let tags: Vec<_> = out.iter().map(|r| r.get("tags").unwrap().clone()).collect();
        assert_eq!(
            names,
            vec![Value::varchar("ada"), Value::varchar("ada"), Value::varchar("cy")]
        );
        assert_eq!(
            tags,
            vec![Value::varchar("x"), Value::varchar("y"), Value::varchar("z")]
        );
        assert_eq!(out.rows()[0].get("age"), out.rows()[1].get("age"));
    }

    #[test]
    fn test_flatten_skips_non_lists() {
        let t = Table::new(vec![
            row! { "v" => 3 },
            row! { "v" => vec![Value::Integer(1)] },
            row! { "other" => 1 },
        ]);
        let out = t.flatten(&col("v")).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows()[0].get("v"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_flatten_requires_column() {
        let err = people().flatten(&lit(1)).unwrap_err();
        assert!(matches!(err, FlowError::InvalidArgument(_)));
    }

    #[test]
    fn test_flatten_nested_field() {
        let t = Table::new(vec![row! { "doc" => row! { "parts" => vec!["a".to_string(), "b".to_string()] } }]);
        let out = t.flatten(&col("doc.parts")).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(
            out.rows()[1].resolve_path(&["doc", "parts"]),
            Some(&Value::varchar("b"))
        );
    }

    #[test]
    fn test_flatten_dotted_top_level_field() {
        let mut r = Row::new();
        r.insert("a.b", vec![Value::Integer(1), Value::Integer(2)]);
        r.insert("a", row! { "b" => 5i64 });
        let out = Table::new(vec![r]).flatten(&col("a.b")).unwrap();

        assert_eq!(out.len(), 2);
        for (exploded, expected) in out.iter().zip([1i64, 2]) {
            assert_eq!(exploded.get("a.b"), Some(&Value::Integer(expected)));
            assert_eq!(exploded.resolve_path(&["a", "b"]), Some(&Value::Integer(5)));
        }
    }

    #[test]
    fn test_filter() {
        let t = people();
        assert_eq!(t.filter(&lit(true)).unwrap(), t);
        assert!(t.filter(&lit(false)).unwrap().is_empty());

        let adult = ScalarFunction::new("adult", |args| Ok(Value::Boolean(args[0].try_as_i64()? >= 18)));
        let out = t.filter(&apply(adult, vec![col("age")])).unwrap();
        assert_eq!(out.len(), 2);

        // Non-boolean results use truthiness
        let out = t.filter(&col("tags")).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_field_names_union() {
        let t = Table::new(vec![row! { "a" => 1 }, row! { "b" => 2, "a" => 3 }]);
        assert_eq!(t.field_names(), vec!["a".to_string(), "b".to_string()]);
    }
}
