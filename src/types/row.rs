//! Ordered field-name-to-value record

use crate::common::constants::FIELD_PATH_SEPARATOR;
use crate::types::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered mapping from field name to value.
///
/// Field order is insertion order. Inserting an existing name replaces the
/// value in place and keeps the original position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(field, _)| field == name)
    }

    /// Get a top-level field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Set a top-level field, returning the previous value if the name existed
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => Some(std::mem::replace(&mut self.fields[idx].1, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    /// Resolve a path segment by segment through nested rows.
    ///
    /// Returns `None` as soon as a segment is missing or an intermediate value
    /// is not a nested row.
    pub fn resolve_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.get(first.as_ref())?;
        for segment in rest {
            match current {
                Value::Struct(row) => current = row.get(segment.as_ref())?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Replace the value at a path.
    ///
    /// Nested rows along the path are updated in place. When the path does not
    /// lead through existing nested rows the dotted name is set as a top-level
    /// field instead.
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: Value) {
        match path {
            [] => {}
            [single] => {
                self.insert(single.as_ref(), value);
            }
            [first, rest @ ..] => {
                if let Some(Value::Struct(inner)) = self.get_mut(first.as_ref()) {
                    if inner.resolve_path(rest).is_some() || rest.len() == 1 {
                        inner.set_path(rest, value);
                        return;
                    }
                }
                let joined = path
                    .iter()
                    .map(|s| s.as_ref())
                    .collect::<Vec<_>>()
                    .join(FIELD_PATH_SEPARATOR);
                self.insert(joined, value);
            }
        }
    }

    /// Field names in order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate over (name, value) pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.insert(name, value);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}}")
    }
}

/// Build a [`Row`] from `name => value` pairs.
///
/// ```
/// use claimflow::row;
/// let r = row! { "id" => 1, "name" => "a" };
/// assert_eq!(r.len(), 2);
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::types::Row::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::types::Row::new();
        $(
            row.insert($name, $crate::types::Value::from($value));
        )+
        row
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_position() {
        let mut row = Row::new().with("a", 1).with("b", 2);
        let old = row.insert("a", 10);
        assert_eq!(old, Some(Value::Integer(1)));
        assert_eq!(row.field_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("a"), Some(&Value::Integer(10)));
    }

    #[test]
    fn test_resolve_nested_path() {
        let inner = Row::new().with("city", "Paris");
        let row = Row::new().with("address", inner).with("n", 1);

        assert_eq!(
            row.resolve_path(&["address", "city"]),
            Some(&Value::varchar("Paris"))
        );
        assert_eq!(row.resolve_path(&["address", "zip"]), None);
        assert_eq!(row.resolve_path(&["n", "deeper"]), None);
        assert_eq!(row.resolve_path::<&str>(&[]), None);
    }

    #[test]
    fn test_set_path() {
        let inner = Row::new().with("city", "Paris");
        let mut row = Row::new().with("address", inner);
        row.set_path(&["address", "city"], Value::varchar("Lyon"));
        assert_eq!(
            row.resolve_path(&["address", "city"]),
            Some(&Value::varchar("Lyon"))
        );

        row.set_path(&["missing", "x"], Value::Integer(1));
        assert_eq!(row.get("missing.x"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_row_macro() {
        let row = crate::row! { "id" => 1, "v" => vec![1.0, 0.0] };
        assert_eq!(row.get("id"), Some(&Value::Integer(1)));
        assert_eq!(
            row.get("v"),
            Some(&Value::list(vec![Value::Double(1.0), Value::Double(0.0)]))
        );
    }
}
