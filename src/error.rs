use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Broad failure category, independent of the concrete variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unreadable source, unwritable destination
    Io,
    /// Malformed tabular content
    Parse,
    /// Input violates a precondition of the pipeline
    DataIntegrity,
}

/// Dataset pipeline errors
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("Schema mismatch: expected at least {expected} columns, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("Unknown label {value:?} for transaction {id}")]
    UnknownLabel { id: i64, value: String },

    #[error("Invalid label code {code} at row {row}")]
    InvalidLabelCode { row: usize, code: i32 },

    #[error("Missing value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Duplicate transaction id {0} in label table")]
    DuplicateId(i64),

    #[error("Artifact row counts differ: {features} feature rows, {labels} labels")]
    ArtifactMismatch { features: usize, labels: usize },

    #[error("Data frame operation failed: {0}")]
    Polars(#[from] PolarsError),
}

impl DatasetError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatasetError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: PolarsError) -> Self {
        DatasetError::Parse {
            path: path.into(),
            source,
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatasetError::Io { .. } => ErrorKind::Io,
            DatasetError::Parse { .. } | DatasetError::Polars(_) => ErrorKind::Parse,
            DatasetError::SchemaMismatch { .. }
            | DatasetError::UnknownLabel { .. }
            | DatasetError::InvalidLabelCode { .. }
            | DatasetError::MissingValue { .. }
            | DatasetError::DuplicateId(_)
            | DatasetError::ArtifactMismatch { .. } => ErrorKind::DataIntegrity,
        }
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;
