//! Caller-supplied scalar functions bound into `Apply` expressions

use crate::common::error::FlowResult;
use crate::types::Value;
use std::fmt;
use std::sync::Arc;

/// Signature of a scalar function body
pub type ScalarFn = dyn Fn(&[Value]) -> FlowResult<Value> + Send + Sync;

/// A named pure function over already-evaluated argument values.
///
/// The function is bound when the expression is built and is never looked up
/// per row. Cloning shares the underlying closure.
#[derive(Clone)]
pub struct ScalarFunction {
    name: String,
    func: Arc<ScalarFn>,
    is_deterministic: bool,
}

impl ScalarFunction {
    /// Create a fallible function
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> FlowResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
            is_deterministic: true,
        }
    }

    /// Create a function that cannot fail
    pub fn infallible<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self::new(name, move |args| Ok(func(args)))
    }

    /// Mark the function as non-deterministic (e.g. it calls a remote service)
    pub fn non_deterministic(mut self) -> Self {
        self.is_deterministic = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_deterministic(&self) -> bool {
        self.is_deterministic
    }

    /// Invoke the function on evaluated arguments
    pub fn invoke(&self, args: &[Value]) -> FlowResult<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for ScalarFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarFunction")
            .field("name", &self.name)
            .field("is_deterministic", &self.is_deterministic)
            .finish_non_exhaustive()
    }
}
