//! Error handling for claimflow

use thiserror::Error;

/// Main error type for dataflow operations
#[derive(Error, Debug)]
pub enum FlowError {
    /// A method call targeted an operation the resolved value does not support
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A grouping key evaluated to a value that cannot be hashed or compared
    #[error("Malformed group key: {0}")]
    MalformedGroup(String),

    /// A single entry of a directory scan could not be read
    #[error("Failed to read source entry {path}: {reason}")]
    SourceRead { path: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for dataflow operations
pub type FlowResult<T> = std::result::Result<T, FlowError>;

/// Macro for creating execution errors
#[macro_export]
macro_rules! execution_err {
    ($msg:expr) => {
        $crate::common::error::FlowError::Execution($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::FlowError::Execution(format!($fmt, $($arg)*))
    };
}

/// Macro for creating unsupported operation errors
#[macro_export]
macro_rules! unsupported_err {
    ($msg:expr) => {
        $crate::common::error::FlowError::UnsupportedOperation($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::FlowError::UnsupportedOperation(format!($fmt, $($arg)*))
    };
}
