//! Error types for the partitioned store
//!
//! Read paths degrade unreadable partitions to empty tables and only log;
//! these errors surface from key validation, directory handling and writes.

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use std::path::PathBuf;

/// Partitioned store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Partition key component cannot address a file
    #[error("invalid partition key: {0}")]
    InvalidKey(String),

    /// IO error on a partition file or directory
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Parquet encoding or decoding failed
    #[error("parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Arrow batch construction or concatenation failed
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Table schema incompatible with the schema already bound at `path`
    #[error("schema mismatch at {path}: expected {expected}, got {actual}")]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Requested column absent from a partition
    #[error("column '{column}' not found in {path}")]
    ColumnNotFound { path: PathBuf, column: String },

    /// Write attempted after `close()`
    #[error("writer for {path} is already closed")]
    WriterClosed { path: PathBuf },
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create schema mismatch error
    pub fn schema_mismatch(
        path: impl Into<PathBuf>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
