//! Reducers collapsing one group's rows into a single value

use crate::common::error::{FlowError, FlowResult};
use crate::execution_err;
use crate::expression::Expression;
use crate::types::{Row, Value};
use std::cmp::Ordering;

/// Running state of one reducer over one group
pub trait ReducerState: std::fmt::Debug + Send {
    /// Feed the next value, in group-membership order
    fn update(&mut self, value: Value) -> FlowResult<()>;

    /// Produce the reduced value
    fn finalize(self: Box<Self>) -> FlowResult<Value>;
}

/// Kinds of reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReducerKind {
    Tuple,
    SortedTuple,
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Any,
}

/// A reducer: a kind plus the expression it reads from each row
#[derive(Debug, Clone)]
pub struct Reducer {
    kind: ReducerKind,
    expr: Option<Expression>,
}

impl Reducer {
    /// Collect one value per row, in the order rows arrived
    pub fn tuple(expr: Expression) -> Self {
        Self::with_expr(ReducerKind::Tuple, expr)
    }

    /// Collect one value per row, sorted ascending
    pub fn sorted_tuple(expr: Expression) -> Self {
        Self::with_expr(ReducerKind::SortedTuple, expr)
    }

    /// Number of rows in the group
    pub fn count() -> Self {
        Self {
            kind: ReducerKind::Count,
            expr: None,
        }
    }

    pub fn sum(expr: Expression) -> Self {
        Self::with_expr(ReducerKind::Sum, expr)
    }

    pub fn avg(expr: Expression) -> Self {
        Self::with_expr(ReducerKind::Avg, expr)
    }

    pub fn min(expr: Expression) -> Self {
        Self::with_expr(ReducerKind::Min, expr)
    }

    pub fn max(expr: Expression) -> Self {
        Self::with_expr(ReducerKind::Max, expr)
    }

    /// The value from the first row of the group
    pub fn any(expr: Expression) -> Self {
        Self::with_expr(ReducerKind::Any, expr)
    }

    fn with_expr(kind: ReducerKind, expr: Expression) -> Self {
        Self {
            kind,
            expr: Some(expr),
        }
    }

    pub fn kind(&self) -> ReducerKind {
        self.kind
    }

    /// Create a fresh state for this reducer
    pub fn create_state(&self) -> Box<dyn ReducerState> {
        match self.kind {
            ReducerKind::Tuple => Box::new(TupleState::default()),
            ReducerKind::SortedTuple => Box::new(SortedTupleState::default()),
            ReducerKind::Count => Box::new(CountState::default()),
            ReducerKind::Sum => Box::new(SumState::default()),
            ReducerKind::Avg => Box::new(AvgState::default()),
            ReducerKind::Min => Box::new(ExtremumState::new(Ordering::Less)),
            ReducerKind::Max => Box::new(ExtremumState::new(Ordering::Greater)),
            ReducerKind::Any => Box::new(AnyState::default()),
        }
    }

    /// Reduce an ordered group of rows
    pub fn reduce(&self, rows: &[&Row]) -> FlowResult<Value> {
        let mut state = self.create_state();
        for row in rows {
            let value = match &self.expr {
                Some(expr) => expr.evaluate(row)?,
                None => Value::Null,
            };
            state.update(value)?;
        }
        state.finalize()
    }
}

#[derive(Debug, Default)]
struct TupleState {
    values: Vec<Value>,
}

impl ReducerState for TupleState {
    fn update(&mut self, value: Value) -> FlowResult<()> {
        self.values.push(value);
        Ok(())
    }

    fn finalize(self: Box<Self>) -> FlowResult<Value> {
        Ok(Value::List(self.values))
    }
}

#[derive(Debug, Default)]
struct SortedTupleState {
    values: Vec<Value>,
}

impl ReducerState for SortedTupleState {
    fn update(&mut self, value: Value) -> FlowResult<()> {
        self.values.push(value);
        Ok(())
    }

    fn finalize(self: Box<Self>) -> FlowResult<Value> {
        let mut values = self.values;
        let mut error = None;
        values.sort_by(|a, b| match a.compare(b) {
            Ok(ordering) => ordering,
            Err(e) => {
                error.get_or_insert(e);
                Ordering::Equal
            }
        });
        match error {
            Some(e) => Err(e),
            None => Ok(Value::List(values)),
        }
    }
}

#[derive(Debug, Default)]
struct CountState {
    count: usize,
}

impl ReducerState for CountState {
    fn update(&mut self, _value: Value) -> FlowResult<()> {
        self.count += 1;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> FlowResult<Value> {
        Ok(Value::Integer(self.count as i64))
    }
}

/// Integer sum that widens to a double once a double is seen
#[derive(Debug, Default)]
struct SumState {
    int_sum: i64,
    float_sum: f64,
    saw_double: bool,
}

impl ReducerState for SumState {
    fn update(&mut self, value: Value) -> FlowResult<()> {
        match value {
            Value::Null => {}
            Value::Integer(v) => {
                self.int_sum = self
                    .int_sum
                    .checked_add(v)
                    .ok_or_else(|| execution_err!("sum overflowed i64"))?;
            }
            Value::Double(v) => {
                self.saw_double = true;
                self.float_sum += v;
            }
            other => {
                return Err(FlowError::InvalidType(format!(
                    "sum requires numeric values, got {}",
                    other.type_name()
                )))
            }
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> FlowResult<Value> {
        if self.saw_double {
            Ok(Value::Double(self.float_sum + self.int_sum as f64))
        } else {
            Ok(Value::Integer(self.int_sum))
        }
    }
}

#[derive(Debug, Default)]
struct AvgState {
    sum: f64,
    count: usize,
}

impl ReducerState for AvgState {
    fn update(&mut self, value: Value) -> FlowResult<()> {
        if value.is_null() {
            return Ok(());
        }
        self.sum += value.try_as_f64()?;
        self.count += 1;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> FlowResult<Value> {
        if self.count == 0 {
            Ok(Value::Null)
        } else {
            Ok(Value::Double(self.sum / self.count as f64))
        }
    }
}

/// Min or max, depending on which ordering replaces the current best
#[derive(Debug)]
struct ExtremumState {
    replace_when: Ordering,
    best: Option<Value>,
}

impl ExtremumState {
    fn new(replace_when: Ordering) -> Self {
        Self {
            replace_when,
            best: None,
        }
    }
}

impl ReducerState for ExtremumState {
    fn update(&mut self, value: Value) -> FlowResult<()> {
        if value.is_null() {
            return Ok(());
        }
        let replace = match &self.best {
            None => true,
            Some(best) => value.compare(best)? == self.replace_when,
        };
        if replace {
            self.best = Some(value);
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> FlowResult<Value> {
        Ok(self.best.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Default)]
struct AnyState {
    first: Option<Value>,
}

impl ReducerState for AnyState {
    fn update(&mut self, value: Value) -> FlowResult<()> {
        if self.first.is_none() {
            self.first = Some(value);
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> FlowResult<Value> {
        Ok(self.first.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::col;
    use crate::row;

    fn group() -> Vec<Row> {
        vec![
            row! { "s" => "b", "n" => 3 },
            row! { "s" => "a", "n" => 1 },
            row! { "s" => "c", "n" => 2, "x" => 0.5 },
        ]
    }

    fn reduce(reducer: Reducer) -> FlowResult<Value> {
        let rows = group();
        let refs: Vec<&Row> = rows.iter().collect();
        reducer.reduce(&refs)
    }

    #[test]
    fn test_tuple_keeps_arrival_order() {
        assert_eq!(
            reduce(Reducer::tuple(col("s"))).unwrap(),
            Value::List(vec![Value::varchar("b"), Value::varchar("a"), Value::varchar("c")])
        );
    }

    #[test]
    fn test_sorted_tuple() {
        assert_eq!(
            reduce(Reducer::sorted_tuple(col("n"))).unwrap(),
            Value::List(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)])
        );
        let rows = vec![row! { "v" => 1 }, row! { "v" => "x" }];
        let refs: Vec<&Row> = rows.iter().collect();
        assert!(Reducer::sorted_tuple(col("v")).reduce(&refs).is_err());
    }

    #[test]
    fn test_numeric_reducers() {
        assert_eq!(reduce(Reducer::count()).unwrap(), Value::Integer(3));
        assert_eq!(reduce(Reducer::sum(col("n"))).unwrap(), Value::Integer(6));
        assert_eq!(reduce(Reducer::sum(col("x"))).unwrap(), Value::Double(0.5));
        assert_eq!(reduce(Reducer::avg(col("n"))).unwrap(), Value::Double(2.0));
        assert_eq!(reduce(Reducer::min(col("n"))).unwrap(), Value::Integer(1));
        assert_eq!(reduce(Reducer::max(col("s"))).unwrap(), Value::varchar("c"));
        assert_eq!(reduce(Reducer::any(col("s"))).unwrap(), Value::varchar("b"));
    }

    #[test]
    fn test_sum_rejects_text() {
        assert!(matches!(
            reduce(Reducer::sum(col("s"))),
            Err(FlowError::InvalidType(_))
        ));
    }

    #[test]
    fn test_empty_group() {
        assert_eq!(Reducer::tuple(col("s")).reduce(&[]).unwrap(), Value::List(vec![]));
        assert_eq!(Reducer::count().reduce(&[]).unwrap(), Value::Integer(0));
        assert_eq!(Reducer::avg(col("n")).reduce(&[]).unwrap(), Value::Null);
        assert_eq!(Reducer::max(col("n")).reduce(&[]).unwrap(), Value::Null);
    }
}
