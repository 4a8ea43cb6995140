use crate::common::error::{FlowError, FlowResult};
use crate::types::row::Row;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single value stored in a row field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value (missing field, unresolved path)
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit double precision
    Double(f64),
    /// Text value
    Varchar(String),
    /// Raw bytes
    Blob(Vec<u8>),
    /// Ordered sequence of values
    List(Vec<Value>),
    /// Nested row
    Struct(Row),
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Double(_) => "Double",
            Value::Varchar(_) => "Varchar",
            Value::Blob(_) => "Blob",
            Value::List(_) => "List",
            Value::Struct(_) => "Struct",
        }
    }

    /// Truthiness used by `filter`.
    ///
    /// Booleans are themselves, null is false, numbers are true when non-zero
    /// and everything with a length is true when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(value) => *value,
            Value::Integer(value) => *value != 0,
            Value::Double(value) => *value != 0.0 && !value.is_nan(),
            Value::Varchar(value) => !value.is_empty(),
            Value::Blob(value) => !value.is_empty(),
            Value::List(values) => !values.is_empty(),
            Value::Struct(row) => !row.is_empty(),
        }
    }

    /// Try to extract a boolean value
    pub fn try_as_boolean(&self) -> FlowResult<bool> {
        match self {
            Value::Boolean(value) => Ok(*value),
            _ => Err(FlowError::InvalidType(format!(
                "Cannot extract boolean from {}",
                self.type_name()
            ))),
        }
    }

    /// Try to extract an i64 value
    pub fn try_as_i64(&self) -> FlowResult<i64> {
        match self {
            Value::Integer(value) => Ok(*value),
            Value::Boolean(value) => Ok(*value as i64),
            _ => Err(FlowError::InvalidType(format!(
                "Cannot extract i64 from {}",
                self.type_name()
            ))),
        }
    }

    /// Try to extract an f64 value
    pub fn try_as_f64(&self) -> FlowResult<f64> {
        match self {
            Value::Double(value) => Ok(*value),
            Value::Integer(value) => Ok(*value as f64),
            _ => Err(FlowError::InvalidType(format!(
                "Cannot extract f64 from {}",
                self.type_name()
            ))),
        }
    }

    /// Try to borrow a string value
    pub fn try_as_str(&self) -> FlowResult<&str> {
        match self {
            Value::Varchar(value) => Ok(value),
            _ => Err(FlowError::InvalidType(format!(
                "Cannot extract string from {}",
                self.type_name()
            ))),
        }
    }

    /// Try to borrow the elements of a list value
    pub fn try_as_list(&self) -> FlowResult<&[Value]> {
        match self {
            Value::List(values) => Ok(values),
            _ => Err(FlowError::InvalidType(format!(
                "Cannot extract list from {}",
                self.type_name()
            ))),
        }
    }

    /// Try to borrow a nested row
    pub fn try_as_struct(&self) -> FlowResult<&Row> {
        match self {
            Value::Struct(row) => Ok(row),
            _ => Err(FlowError::InvalidType(format!(
                "Cannot extract struct from {}",
                self.type_name()
            ))),
        }
    }

    /// Interpret a list of numbers as a dense vector
    pub fn try_as_vector(&self) -> FlowResult<Vec<f64>> {
        self.try_as_list()?
            .iter()
            .map(|v| match v {
                Value::Double(x) => Ok(*x),
                Value::Integer(x) => Ok(*x as f64),
                other => Err(FlowError::InvalidType(format!(
                    "Vector element must be numeric, got {}",
                    other.type_name()
                ))),
            })
            .collect()
    }

    pub fn boolean(value: bool) -> Self {
        Value::Boolean(value)
    }

    pub fn integer(value: i64) -> Self {
        Value::Integer(value)
    }

    pub fn double(value: f64) -> Self {
        Value::Double(value)
    }

    pub fn varchar(value: impl Into<String>) -> Self {
        Value::Varchar(value.into())
    }

    pub fn list(values: Vec<Value>) -> Self {
        Value::List(values)
    }

    /// Compare two values for ordering (used by min/max/sorted reducers)
    pub fn compare(&self, other: &Value) -> FlowResult<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Ok(Ordering::Equal),
            // Null sorts before any value
            (Value::Null, _) => Ok(Ordering::Less),
            (_, Value::Null) => Ok(Ordering::Greater),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a
                .partial_cmp(b)
                .ok_or_else(|| FlowError::InvalidValue("Cannot compare NaN values".to_string())),
            (Value::Integer(a), Value::Double(b)) => (*a as f64)
                .partial_cmp(b)
                .ok_or_else(|| FlowError::InvalidValue("Cannot compare NaN values".to_string())),
            (Value::Double(a), Value::Integer(b)) => a
                .partial_cmp(&(*b as f64))
                .ok_or_else(|| FlowError::InvalidValue("Cannot compare NaN values".to_string())),
            (Value::Varchar(a), Value::Varchar(b)) => Ok(a.cmp(b)),
            (Value::Blob(a), Value::Blob(b)) => Ok(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        ordering => return Ok(ordering),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            _ => Err(FlowError::InvalidType(format!(
                "Cannot compare {} and {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// Convert to a JSON value.
    ///
    /// Blobs become lossy UTF-8 strings and non-finite doubles become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(value) => serde_json::Value::Bool(*value),
            Value::Integer(value) => serde_json::Value::from(*value),
            Value::Double(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Varchar(value) => serde_json::Value::String(value.clone()),
            Value::Blob(data) => {
                serde_json::Value::String(String::from_utf8_lossy(data).into_owned())
            }
            Value::List(values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
            Value::Struct(row) => serde_json::Value::Object(
                row.iter()
                    .map(|(name, value)| (name.to_string(), value.to_json()))
                    .collect(),
            ),
        }
    }

    /// Build a value from parsed JSON
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Boolean(*value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => Value::Integer(value),
                None => Value::Double(number.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(value) => Value::Varchar(value.clone()),
            serde_json::Value::Array(values) => {
                Value::List(values.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Struct(
                map.iter()
                    .map(|(name, value)| (name.clone(), Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Text written into a delimited output cell
    pub fn to_cell(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(value) => value.to_string(),
            Value::Integer(value) => value.to_string(),
            Value::Double(value) => value.to_string(),
            Value::Varchar(value) => value.clone(),
            Value::Blob(data) => String::from_utf8_lossy(data).into_owned(),
            Value::List(_) | Value::Struct(_) => self.to_json().to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Double(value) => write!(f, "{}", value),
            Value::Varchar(value) => write!(f, "'{}'", value),
            Value::Blob(data) => write!(f, "BLOB({} bytes)", data.len()),
            Value::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Value::Struct(row) => write!(f, "{}", row),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Varchar(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::List(values.into_iter().map(Value::Double).collect())
    }
}

impl From<Vec<String>> for Value {
    fn from(values: Vec<String>) -> Self {
        Value::List(values.into_iter().map(Value::Varchar).collect())
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

impl From<Row> for Value {
    fn from(row: Row) -> Self {
        Value::Struct(row)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_creation() {
        let bool_val = Value::boolean(true);
        assert!(bool_val.try_as_boolean().unwrap());

        let int_val = Value::integer(42);
        assert_eq!(int_val.try_as_i64().unwrap(), 42);

        let double_val = Value::double(3.5);
        assert_eq!(double_val.try_as_f64().unwrap(), 3.5);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(Value::Integer(-3).is_truthy());
        assert!(!Value::Double(f64::NAN).is_truthy());
        assert!(!Value::varchar("").is_truthy());
        assert!(Value::list(vec![Value::Null]).is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
    }

    #[test]
    fn test_equality_is_variant_exact() {
        assert_eq!(Value::Blob(vec![1, 2]), Value::Blob(vec![1, 2]));
        assert_ne!(Value::Integer(1), Value::Double(1.0));
        assert_ne!(Value::Double(f64::NAN), Value::Double(f64::NAN));
    }

    #[test]
    fn test_value_comparison() {
        let int1 = Value::integer(10);
        let int2 = Value::integer(20);
        assert_eq!(int1.compare(&int2).unwrap(), Ordering::Less);

        let str1 = Value::varchar("apple");
        let str2 = Value::varchar("banana");
        assert_eq!(str1.compare(&str2).unwrap(), Ordering::Less);

        assert_eq!(
            Value::Integer(2).compare(&Value::Double(1.5)).unwrap(),
            Ordering::Greater
        );
        assert!(Value::varchar("a").compare(&Value::Integer(1)).is_err());
    }

    #[test]
    fn test_vector_extraction() {
        let v = Value::list(vec![Value::Integer(1), Value::Double(0.5)]);
        assert_eq!(v.try_as_vector().unwrap(), vec![1.0, 0.5]);

        let bad = Value::list(vec![Value::varchar("x")]);
        assert!(matches!(bad.try_as_vector(), Err(FlowError::InvalidType(_))));
    }

    #[test]
    fn test_json_conversion() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"status": "neutral", "score": 2, "quote": null}"#).unwrap();
        let value = Value::from_json(&json);
        let row = value.try_as_struct().unwrap();
        assert_eq!(row.get("status"), Some(&Value::varchar("neutral")));
        assert_eq!(row.get("score"), Some(&Value::Integer(2)));
        assert_eq!(row.get("quote"), Some(&Value::Null));
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_cells() {
        assert_eq!(Value::Null.to_cell(), "");
        assert_eq!(Value::varchar("plain").to_cell(), "plain");
        assert_eq!(Value::Blob(b"bytes".to_vec()).to_cell(), "bytes");
        assert_eq!(
            Value::list(vec![Value::Integer(1), Value::varchar("a")]).to_cell(),
            r#"[1,"a"]"#
        );
    }
}
