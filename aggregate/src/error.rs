use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning raw benchmark output into tables.
///
/// Structural errors (line, block and token counts, units) are never
/// recovered from silently: a misparsed file would corrupt every statistic
/// computed from it.
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("expected {expected} lines, found {found}")]
    LineCount { expected: usize, found: usize },

    #[error("expected {expected} lines containing '{marker}', found {found}")]
    BlockCount {
        marker: String,
        expected: usize,
        found: usize,
    },

    #[error("expected {expected} numeric tokens in '{line}', found {found}")]
    TokenCount {
        line: String,
        expected: usize,
        found: usize,
    },

    #[error("no known unit ({allowed}) in '{line}'")]
    UnknownUnit { line: String, allowed: String },

    #[error("no line containing '{marker}'")]
    MissingMarker { marker: String },

    #[error("unexpected value in '{line}': {message}")]
    UnexpectedValue { line: String, message: String },

    #[error("{}: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<AggregateError>,
    },

    #[error("file '{file}' matches rules for several variants: {variants}")]
    AmbiguousVariant { file: String, variants: String },

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(#[from] anyhow::Error),
}

impl AggregateError {
    /// Attaches the offending file to an error.
    pub fn in_file(path: impl Into<PathBuf>, source: Self) -> Self {
        Self::InFile {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// The error without the file context.
    #[must_use]
    pub fn inner(&self) -> &Self {
        match self {
            Self::InFile { source, .. } => source.inner(),
            other => other,
        }
    }

    /// Whether the error describes a raw file that does not have the expected shape.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        match self {
            Self::LineCount { .. }
            | Self::BlockCount { .. }
            | Self::TokenCount { .. }
            | Self::UnknownUnit { .. }
            | Self::MissingMarker { .. }
            | Self::UnexpectedValue { .. } => true,
            Self::InFile { source, .. } => source.is_structural(),
            _ => false,
        }
    }
}

/// Result type for aggregation operations
pub type Result<T, E = AggregateError> = std::result::Result<T, E>;
