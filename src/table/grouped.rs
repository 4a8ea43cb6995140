//! Grouping by evaluated key tuples

use crate::common::error::{FlowError, FlowResult};
use crate::expression::Expression;
use crate::table::reducer::Reducer;
use crate::table::table::Table;
use crate::types::{Row, Value};
use ordered_float::OrderedFloat;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Hashable image of one key component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyComponent {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(OrderedFloat<f64>),
    Varchar(String),
    Blob(Vec<u8>),
    List(Vec<KeyComponent>),
    Struct(Vec<(String, KeyComponent)>),
}

impl TryFrom<&Value> for KeyComponent {
    type Error = FlowError;

    fn try_from(value: &Value) -> FlowResult<Self> {
        Ok(match value {
            Value::Null => KeyComponent::Null,
            Value::Boolean(v) => KeyComponent::Boolean(*v),
            Value::Integer(v) => KeyComponent::Integer(*v),
            Value::Double(v) => {
                if v.is_nan() {
                    return Err(FlowError::MalformedGroup(
                        "NaN cannot be used as a group key".to_string(),
                    ));
                }
                KeyComponent::Double(OrderedFloat(*v))
            }
            Value::Varchar(v) => KeyComponent::Varchar(v.clone()),
            Value::Blob(v) => KeyComponent::Blob(v.clone()),
            Value::List(values) => KeyComponent::List(
                values
                    .iter()
                    .map(KeyComponent::try_from)
                    .collect::<FlowResult<_>>()?,
            ),
            Value::Struct(row) => KeyComponent::Struct(
                row.iter()
                    .map(|(name, v)| -> FlowResult<(String, KeyComponent)> {
                        Ok((name.to_string(), KeyComponent::try_from(v)?))
                    })
                    .collect::<FlowResult<_>>()?,
            ),
        })
    }
}

/// The evaluated key tuple of one group; empty for the global group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey(Vec<KeyComponent>);

impl GroupKey {
    /// Build a key from evaluated values, failing on unhashable components
    pub fn from_values(values: &[Value]) -> FlowResult<Self> {
        values
            .iter()
            .map(KeyComponent::try_from)
            .collect::<FlowResult<Vec<_>>>()
            .map(GroupKey)
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }
}

struct Group<'a> {
    key_values: Vec<Value>,
    rows: Vec<&'a Row>,
}

/// A table partitioned by key expressions, awaiting `reduce`
#[derive(Debug, Clone)]
pub struct GroupedTable {
    table: Table,
    keys: Vec<(String, Expression)>,
}

impl GroupedTable {
    /// Key expressions must be field references; their dotted names become the
    /// output field names.
    pub fn new(table: Table, keys: Vec<Expression>) -> FlowResult<Self> {
        let mut named = Vec::with_capacity(keys.len());
        let mut seen = HashSet::new();
        for key in keys {
            let name = match key.as_column() {
                Some(column) => column.name(),
                None => {
                    return Err(FlowError::InvalidArgument(format!(
                        "groupby keys must be field references, got {}",
                        key
                    )))
                }
            };
            if !seen.insert(name.clone()) {
                return Err(FlowError::InvalidArgument(format!(
                    "Duplicate groupby key '{}'",
                    name
                )));
            }
            named.push((name, key));
        }
        Ok(Self { table, keys: named })
    }

    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|(name, _)| name.as_str())
    }

    /// Partition rows in first-seen key order
    fn partition(&self) -> FlowResult<Vec<Group<'_>>> {
        if self.keys.is_empty() {
            return Ok(vec![Group {
                key_values: Vec::new(),
                rows: self.table.iter().collect(),
            }]);
        }

        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<Group<'_>> = Vec::new();
        for row in self.table.iter() {
            let key_values = self
                .keys
                .iter()
                .map(|(_, expr)| expr.evaluate(row))
                .collect::<FlowResult<Vec<_>>>()?;
            let key = GroupKey::from_values(&key_values)?;
            match index.get(&key) {
                Some(&idx) => groups[idx].rows.push(row),
                None => {
                    index.insert(key, groups.len());
                    groups.push(Group {
                        key_values,
                        rows: vec![row],
                    });
                }
            }
        }
        Ok(groups)
    }

    /// Collapse every group into one row.
    ///
    /// Each output row holds the key fields (in key order) followed by one
    /// field per reducer (in the given order).
    pub fn reduce<I, S>(&self, reducers: I) -> FlowResult<Table>
    where
        I: IntoIterator<Item = (S, Reducer)>,
        S: Into<String>,
    {
        let reducers: Vec<(String, Reducer)> = reducers
            .into_iter()
            .map(|(name, reducer)| (name.into(), reducer))
            .collect();

        let mut names: HashSet<&str> = self.key_names().collect();
        for (name, _) in &reducers {
            if !names.insert(name.as_str()) {
                return Err(FlowError::InvalidArgument(format!(
                    "Reducer output '{}' collides with another output field",
                    name
                )));
            }
        }

        let groups = self.partition()?;
        debug!(
            rows = self.table.len(),
            groups = groups.len(),
            keys = self.keys.len(),
            "grouped rows"
        );

        let mut out = Vec::with_capacity(groups.len());
        for group in groups {
            let mut row = Row::with_capacity(self.keys.len() + reducers.len());
            for ((name, _), value) in self.keys.iter().zip(group.key_values) {
                row.insert(name.clone(), value);
            }
            for (name, reducer) in &reducers {
                row.insert(name.clone(), reducer.reduce(&group.rows)?);
            }
            out.push(row);
        }
        Ok(Table::new(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{col, lit};
    use crate::row;
    use pretty_assertions::assert_eq;

    fn matches() -> Table {
        Table::new(vec![
            row! { "story" => "s1", "claim" => "c1", "chunk" => "k1" },
            row! { "story" => "s2", "claim" => "c9", "chunk" => "k7" },
            row! { "story" => "s1", "claim" => "c1", "chunk" => "k2" },
            row! { "story" => "s1", "claim" => "c2", "chunk" => "k3" },
        ])
    }

    #[test]
    fn test_group_by_two_keys() {
        let out = matches()
            .groupby(vec![col("story"), col("claim")])
            .unwrap()
            .reduce([("chunks", Reducer::tuple(col("chunk")))])
            .unwrap();

        assert_eq!(
            out.rows().to_vec(),
            vec![
                row! { "story" => "s1", "claim" => "c1", "chunks" => vec!["k1".to_string(), "k2".to_string()] },
                row! { "story" => "s2", "claim" => "c9", "chunks" => vec!["k7".to_string()] },
                row! { "story" => "s1", "claim" => "c2", "chunks" => vec!["k3".to_string()] },
            ]
        );
    }

    #[test]
    fn test_collected_lengths_sum_to_row_count() {
        let t = matches();
        let out = t
            .groupby(vec![col("story")])
            .unwrap()
            .reduce([("chunks", Reducer::tuple(col("chunk"))), ("n", Reducer::count())])
            .unwrap();
        assert_eq!(out.len(), 2);
        let total: usize = out
            .iter()
            .map(|r| r.get("chunks").unwrap().try_as_list().unwrap().len())
            .sum();
        assert_eq!(total, t.len());
    }

    #[test]
    fn test_global_group() {
        let out = matches()
            .groupby(vec![])
            .unwrap()
            .reduce([("n", Reducer::count())])
            .unwrap();
        assert_eq!(out.rows().to_vec(), vec![row! { "n" => 4 }]);

        let empty = Table::empty()
            .groupby(vec![])
            .unwrap()
            .reduce([("all", Reducer::tuple(col("x")))])
            .unwrap();
        assert_eq!(empty.rows().to_vec(), vec![row! { "all" => Vec::<Value>::new() }]);
    }

    #[test]
    fn test_keyed_groupby_on_empty_table() {
        let out = Table::empty()
            .groupby(vec![col("story")])
            .unwrap()
            .reduce([("n", Reducer::count())])
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_nan_key_is_malformed() {
        let t = Table::new(vec![row! { "k" => f64::NAN }]);
        let err = t
            .groupby(vec![col("k")])
            .unwrap()
            .reduce([("n", Reducer::count())])
            .unwrap_err();
        assert!(matches!(err, FlowError::MalformedGroup(_)));
    }

    #[test]
    fn test_list_keys_group_by_value() {
        let t = Table::new(vec![
            row! { "k" => vec![1.0, 2.0], "v" => 1 },
            row! { "k" => vec![1.0, 2.0], "v" => 2 },
        ]);
        let out = t
            .groupby(vec![col("k")])
            .unwrap()
            .reduce([("total", Reducer::sum(col("v")))])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows()[0].get("total"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_invalid_keys_and_names() {
        assert!(matches!(
            matches().groupby(vec![lit(1)]),
            Err(FlowError::InvalidArgument(_))
        ));
        assert!(matches!(
            matches().groupby(vec![col("story"), col("story")]),
            Err(FlowError::InvalidArgument(_))
        ));
        let err = matches()
            .groupby(vec![col("story")])
            .unwrap()
            .reduce([("story", Reducer::count())])
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidArgument(_)));
    }
}
