//! Error types for the tasksets crate

use thiserror::Error;

/// Main error type for the tasksets crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid assignment of context {context} to cluster {cluster}: {reason}")]
    InvalidAssignment {
        context: usize,
        cluster: usize,
        reason: String,
    },

    #[error("context {context} is out of range (expected fewer than {limit} contexts)")]
    ContextOutOfRange { context: usize, limit: usize },

    #[error("context {context} has no cluster assignment")]
    UnassignedContext { context: usize },

    #[error("hypothesis population became empty while {operation}")]
    EmptyPopulation { operation: String },

    #[error("probability vector for {context} sums to {total} and cannot be normalized")]
    DegenerateDistribution { context: String, total: f64 },

    #[error("shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("reward {value} must be finite and lie in [0, 1]")]
    InvalidReward { value: f64 },

    #[error("action {action} is out of range (expected fewer than {limit})")]
    InvalidAction { action: usize, limit: usize },

    #[error("location ({x}, {y}) is not part of the grid")]
    UnknownLocation { x: i32, y: i32 },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("task has no active trial")]
    TaskExhausted,

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            message: message.into(),
        }
    }
}
