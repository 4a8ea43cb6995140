//! Core expression types for claimflow
//!
//! Expressions are symbolic descriptions of a computation over one row. They
//! are built once, shared across every row they are applied to, and evaluated
//! lazily with [`Expression::evaluate`].

use crate::common::constants::FIELD_PATH_SEPARATOR;
use crate::common::error::{FlowError, FlowResult};
use crate::expression::function::ScalarFunction;
use crate::expression::method::call_method;
use crate::types::{Row, Value};
use std::fmt;

/// A reference to a (possibly nested) field, stored as path segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    path: Vec<String>,
}

impl ColumnRef {
    /// Parse a dotted path such as `"address.city"`
    pub fn new(name: &str) -> Self {
        Self {
            path: name.split(FIELD_PATH_SEPARATOR).map(str::to_string).collect(),
        }
    }

    pub fn from_segments(path: Vec<String>) -> Self {
        Self { path }
    }

    /// Extend the path by one segment
    pub fn field(&self, segment: &str) -> Self {
        let mut path = self.path.clone();
        path.push(segment.to_string());
        Self { path }
    }

    pub fn segments(&self) -> &[String] {
        &self.path
    }

    /// The dotted name, used as an output field name
    pub fn name(&self) -> String {
        self.path.join(FIELD_PATH_SEPARATOR)
    }

    fn resolve(&self, row: &Row) -> Value {
        if self.path.len() > 1 {
            // A field literally named "a.b" wins over the nested lookup
            if let Some(value) = row.get(&self.name()) {
                return value.clone();
            }
        }
        row.resolve_path(&self.path).cloned().unwrap_or(Value::Null)
    }
}

/// Expression tree
#[derive(Debug, Clone)]
pub enum Expression {
    /// Field reference
    Column(ColumnRef),
    /// Caller-bound function applied to evaluated arguments
    Apply {
        function: ScalarFunction,
        args: Vec<Expression>,
    },
    /// Named operation invoked on the receiver's evaluated value
    MethodCall {
        receiver: Box<Expression>,
        method: String,
        args: Vec<Expression>,
    },
    /// Value equality of both sides
    Equals(Box<Expression>, Box<Expression>),
    /// Ordered collection of independently evaluated expressions
    Tuple(Vec<Expression>),
    /// Already-resolved value; evaluates to itself
    Literal(Value),
}

impl Expression {
    /// Evaluate this expression against a row
    pub fn evaluate(&self, row: &Row) -> FlowResult<Value> {
        match self {
            Expression::Column(column) => Ok(column.resolve(row)),
            Expression::Apply { function, args } => {
                let resolved = evaluate_all(args, row)?;
                function.invoke(&resolved)
            }
            Expression::MethodCall {
                receiver,
                method,
                args,
            } => {
                let target = receiver.evaluate(row)?;
                let resolved = evaluate_all(args, row)?;
                call_method(&target, method, &resolved)
            }
            Expression::Equals(left, right) => {
                let left = left.evaluate(row)?;
                let right = right.evaluate(row)?;
                Ok(Value::Boolean(left == right))
            }
            Expression::Tuple(items) => Ok(Value::List(evaluate_all(items, row)?)),
            Expression::Literal(value) => {
                #[cfg(debug_assertions)]
                tracing::trace!(value = %value, "literal passed where an expression was expected");
                Ok(value.clone())
            }
        }
    }

    /// Method call on this expression's value
    pub fn method(self, method: impl Into<String>, args: Vec<Expression>) -> Expression {
        Expression::MethodCall {
            receiver: Box::new(self),
            method: method.into(),
            args,
        }
    }

    /// Equality comparison with another expression
    pub fn eq(self, other: impl Into<Expression>) -> Expression {
        Expression::Equals(Box::new(self), Box::new(other.into()))
    }

    /// Nested field access on a column reference.
    ///
    /// On any other expression this fails, since only field references carry
    /// a path.
    pub fn field(&self, segment: &str) -> FlowResult<Expression> {
        match self {
            Expression::Column(column) => Ok(Expression::Column(column.field(segment))),
            other => Err(FlowError::InvalidArgument(format!(
                "Cannot access field '{}' on non-column expression {}",
                segment, other
            ))),
        }
    }

    /// The referenced column, if this is a field reference
    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            Expression::Column(column) => Some(column),
            _ => None,
        }
    }

    /// Check if every function in this expression is deterministic
    pub fn is_deterministic(&self) -> bool {
        match self {
            Expression::Column(_) | Expression::Literal(_) => true,
            Expression::Apply { function, args } => {
                function.is_deterministic() && args.iter().all(Expression::is_deterministic)
            }
            Expression::MethodCall { receiver, args, .. } => {
                receiver.is_deterministic() && args.iter().all(Expression::is_deterministic)
            }
            Expression::Equals(left, right) => left.is_deterministic() && right.is_deterministic(),
            Expression::Tuple(items) => items.iter().all(Expression::is_deterministic),
        }
    }
}

fn evaluate_all(exprs: &[Expression], row: &Row) -> FlowResult<Vec<Value>> {
    exprs.iter().map(|expr| expr.evaluate(row)).collect()
}

/// Evaluate `expr` against `row`
pub fn evaluate(expr: &Expression, row: &Row) -> FlowResult<Value> {
    expr.evaluate(row)
}

/// Reference a field by dotted path
pub fn col(name: &str) -> Expression {
    Expression::Column(ColumnRef::new(name))
}

/// Wrap a value as a literal expression
pub fn lit(value: impl Into<Value>) -> Expression {
    Expression::Literal(value.into())
}

/// Apply a bound function to argument expressions
pub fn apply(function: ScalarFunction, args: Vec<Expression>) -> Expression {
    Expression::Apply { function, args }
}

/// Group expressions into a tuple
pub fn tuple(items: Vec<Expression>) -> Expression {
    Expression::Tuple(items)
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Literal(value)
    }
}

impl From<ColumnRef> for Expression {
    fn from(column: ColumnRef) -> Self {
        Expression::Column(column)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }

        match self {
            Expression::Column(column) => write!(f, "this.{}", column.name()),
            Expression::Apply { function, args } => {
                write!(f, "{}(", function.name())?;
                list(f, args)?;
                write!(f, ")")
            }
            Expression::MethodCall {
                receiver,
                method,
                args,
            } => {
                write!(f, "{}.{}(", receiver, method)?;
                list(f, args)?;
                write!(f, ")")
            }
            Expression::Equals(left, right) => write!(f, "{} == {}", left, right),
            Expression::Tuple(items) => {
                write!(f, "(")?;
                list(f, items)?;
                write!(f, ")")
            }
            Expression::Literal(value) => write!(f, "{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    fn sample() -> Row {
        let address = row! { "city" => "Paris", "zip" => "75001" };
        row! {
            "id" => 7,
            "name" => "Ada",
            "address" => address,
            "data" => b"chapter one".to_vec(),
        }
    }

    #[test]
    fn test_column_resolution() {
        let r = sample();
        assert_eq!(col("id").evaluate(&r).unwrap(), Value::Integer(7));
        assert_eq!(
            col("address.city").evaluate(&r).unwrap(),
            Value::varchar("Paris")
        );
        assert_eq!(col("address.country").evaluate(&r).unwrap(), Value::Null);
        assert_eq!(col("missing.deep.path").evaluate(&r).unwrap(), Value::Null);
        assert_eq!(col("id.nested").evaluate(&r).unwrap(), Value::Null);
    }

    #[test]
    fn test_dotted_field_name_takes_precedence() {
        let r = row! { "novel.id" => "flat", "novel" => row! { "id" => "nested" } };
        assert_eq!(col("novel.id").evaluate(&r).unwrap(), Value::varchar("flat"));
    }

    #[test]
    fn test_field_builder() {
        let city = col("address").field("city").unwrap();
        assert_eq!(city.evaluate(&sample()).unwrap(), Value::varchar("Paris"));
        assert!(lit(1).field("x").is_err());
    }

    #[test]
    fn test_apply() {
        let shout = ScalarFunction::new("shout", |args| {
            Ok(Value::Varchar(format!("{}!", args[0].try_as_str()?)))
        });
        let expr = apply(shout, vec![col("name")]);
        assert_eq!(expr.evaluate(&sample()).unwrap(), Value::varchar("Ada!"));
    }

    #[test]
    fn test_method_call() {
        let expr = col("data").method("decode", vec![]).method("upper", vec![]);
        assert_eq!(
            expr.evaluate(&sample()).unwrap(),
            Value::varchar("CHAPTER ONE")
        );

        let bad = col("id").method("decode", vec![]);
        assert!(matches!(
            bad.evaluate(&sample()),
            Err(FlowError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_equals() {
        let r = sample();
        assert_eq!(
            col("name").eq(lit("Ada")).evaluate(&r).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            col("id").eq(lit(7.0)).evaluate(&r).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            col("data").eq(lit(b"chapter one".to_vec())).evaluate(&r).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_tuple_and_literal() {
        let r = sample();
        let expr = tuple(vec![col("id"), col("address.zip"), lit(true)]);
        assert_eq!(
            expr.evaluate(&r).unwrap(),
            Value::List(vec![
                Value::Integer(7),
                Value::varchar("75001"),
                Value::Boolean(true)
            ])
        );

        let passthrough: Expression = Value::Integer(3).into();
        assert_eq!(passthrough.evaluate(&r).unwrap(), Value::Integer(3));
    }

    #[test]
    fn test_evaluation_does_not_mutate_row() {
        let r = sample();
        let before = r.clone();
        let _ = col("data").method("decode", vec![]).evaluate(&r).unwrap();
        assert_eq!(r, before);
    }

    #[test]
    fn test_display_and_determinism() {
        let f = ScalarFunction::infallible("embed", |_| Value::Null).non_deterministic();
        let expr = apply(f, vec![col("chunk")]);
        assert_eq!(expr.to_string(), "embed(this.chunk)");
        assert!(!expr.is_deterministic());
        assert!(col("a").eq(lit(1)).is_deterministic());
    }
}
