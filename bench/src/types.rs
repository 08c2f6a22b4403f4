//! Error definitions for the benchmark driver

use std::time::Duration;

use thiserror::Error;

/// Result type for benchmark operations
pub type BenchmarkResult<T> = Result<T, BenchmarkError>;

/// Comprehensive error types for benchmark operations
#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A remote command could not be run or exited unsuccessfully.
    #[error("Remote command failed on {host}: {message}")]
    Remote { host: String, message: String },

    /// A tool ran but its output lacks the expected result.
    #[error("Missing output on {host}: {message}")]
    MissingOutput { host: String, message: String },

    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        last: Box<BenchmarkError>,
    },

    #[error("Cancelled")]
    Cancelled,

    #[error("Command on {host} timed out after {timeout:?}")]
    Timeout { host: String, timeout: Duration },

    #[error("Aggregation error: {0}")]
    Aggregate(#[from] aggregate::AggregateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(#[from] anyhow::Error),
}

impl BenchmarkError {
    pub fn remote(host: &str, message: impl Into<String>) -> Self {
        Self::Remote {
            host: host.to_string(),
            message: message.into(),
        }
    }

    pub fn missing_output(host: &str, message: impl Into<String>) -> Self {
        Self::MissingOutput {
            host: host.to_string(),
            message: message.into(),
        }
    }

    /// Whether retrying the failed step may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Remote { .. } | Self::MissingOutput { .. } | Self::Timeout { .. }
        )
    }
}
