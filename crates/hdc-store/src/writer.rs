//! Incremental partition writer
//!
//! The target file is created lazily on the first non-empty write, which
//! binds the writer's schema; later tables must match it. Writing an empty
//! table is a no-op, so a writer that only ever sees empty tables leaves no
//! file behind.

use crate::error::{StoreError, StoreResult};
use crate::table::Table;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression as ParquetCompression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Partition file compression codec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Snappy
    #[default]
    Snappy,
    /// Zstandard at its default level
    Zstd,
    /// Uncompressed
    None,
}

impl Compression {
    fn to_parquet(self) -> ParquetCompression {
        match self {
            Self::Snappy => ParquetCompression::SNAPPY,
            Self::Zstd => ParquetCompression::ZSTD(ZstdLevel::default()),
            Self::None => ParquetCompression::UNCOMPRESSED,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Snappy => "snappy",
            Self::Zstd => "zstd",
            Self::None => "none",
        })
    }
}

impl FromStr for Compression {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snappy" => Ok(Self::Snappy),
            "zstd" => Ok(Self::Zstd),
            "none" | "uncompressed" => Ok(Self::None),
            other => Err(StoreError::InvalidKey(format!(
                "unknown compression '{other}'"
            ))),
        }
    }
}

/// Writer accumulating tables into a single partition file
///
/// Dropping an open writer closes it; prefer [`PartitionWriter::close`] to
/// observe errors.
pub struct PartitionWriter {
    path: PathBuf,
    compression: Compression,
    schema: Option<SchemaRef>,
    inner: Option<ArrowWriter<File>>,
    rows_written: usize,
    closed: bool,
}

impl PartitionWriter {
    /// Create writer targeting `path`; nothing is created yet
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            compression: Compression::default(),
            schema: None,
            inner: None,
            rows_written: 0,
            closed: false,
        }
    }

    /// Set compression codec used when the file is created
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Target path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema bound by the first non-empty write
    #[inline]
    #[must_use]
    pub fn schema(&self) -> Option<&SchemaRef> {
        self.schema.as_ref()
    }

    /// Whether the file has been created
    #[inline]
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.schema.is_some()
    }

    /// Rows written so far
    #[inline]
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Append a table
    ///
    /// # Errors
    /// - `StoreError::SchemaMismatch` when the table's columns differ from
    ///   the bound schema in name, order or type
    /// - `StoreError::WriterClosed` after [`PartitionWriter::close`]
    /// - `StoreError::Io` / `StoreError::Parquet` on file errors
    pub fn write(&mut self, table: &Table) -> StoreResult<&mut Self> {
        let Some(batch) = table.batch().filter(|b| b.num_rows() > 0) else {
            return Ok(self);
        };
        if self.closed {
            return Err(StoreError::WriterClosed {
                path: self.path.clone(),
            });
        }

        let batch = match &self.schema {
            Some(bound) => conform(&self.path, bound, batch)?,
            None => {
                self.open(batch.schema())?;
                batch.clone()
            }
        };

        if let Some(writer) = self.inner.as_mut() {
            writer.write(&batch)?;
        }
        self.rows_written += batch.num_rows();
        Ok(self)
    }

    /// Finalize the file
    ///
    /// Leaves no file when nothing was written; either way later non-empty
    /// writes are rejected.
    ///
    /// # Errors
    /// `StoreError::Parquet` when the footer cannot be written.
    pub fn close(&mut self) -> StoreResult<()> {
        self.closed = true;
        if let Some(writer) = self.inner.take() {
            writer.close()?;
            tracing::debug!(
                path = %self.path.display(),
                rows = self.rows_written,
                "partition written"
            );
        }
        Ok(())
    }

    fn open(&mut self, schema: SchemaRef) -> StoreResult<()> {
        let file = File::create(&self.path).map_err(|e| StoreError::io_error(&self.path, e))?;
        let props = WriterProperties::builder()
            .set_compression(self.compression.to_parquet())
            .build();
        let writer = ArrowWriter::try_new(file, Arc::clone(&schema), Some(props))?;
        self.inner = Some(writer);
        self.schema = Some(schema);
        Ok(())
    }
}

impl fmt::Debug for PartitionWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionWriter")
            .field("path", &self.path)
            .field("compression", &self.compression)
            .field("started", &self.is_started())
            .field("rows_written", &self.rows_written)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Drop for PartitionWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.inner.take() {
            if let Err(e) = writer.close() {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to close partition writer on drop"
                );
            }
        }
    }
}

/// Re-wrap `batch` under the bound schema, rejecting any real difference
fn conform(path: &Path, bound: &SchemaRef, batch: &RecordBatch) -> StoreResult<RecordBatch> {
    let incoming = batch.schema();
    let same_shape = bound.fields().len() == incoming.fields().len()
        && bound
            .fields()
            .iter()
            .zip(incoming.fields().iter())
            .zip(batch.columns())
            .all(|((expected, actual), column)| {
                expected.name() == actual.name()
                    && expected.data_type() == actual.data_type()
                    && (expected.is_nullable() || column.null_count() == 0)
            });
    if !same_shape {
        return Err(StoreError::schema_mismatch(
            path,
            describe(bound),
            describe(&incoming),
        ));
    }
    Ok(RecordBatch::try_new(Arc::clone(bound), batch.columns().to_vec())?)
}

fn describe(schema: &SchemaRef) -> String {
    let fields: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| format!("{}: {}", f.name(), f.data_type()))
        .collect();
    format!("[{}]", fields.join(", "))
}
