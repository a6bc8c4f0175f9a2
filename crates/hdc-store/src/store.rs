//! Partitioned store
//!
//! Reads degrade gracefully: a missing partition reads as [`Table::Empty`],
//! and an unreadable one is logged and treated the same way. The
//! consolidated partition, when present, is authoritative for
//! [`PartitionedStore::read_all`].

use crate::error::{StoreError, StoreResult};
use crate::key::{EntityCode, FiscalYear, PartitionKey};
use crate::layout::{PartitionPattern, StoreLayout};
use crate::listing::{FsListing, PartitionListing};
use crate::table::{ColumnTypes, Table};
use crate::writer::{Compression, PartitionWriter};
use arrow::compute::concat_batches;
use arrow::datatypes::Schema;
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchOptions, RecordBatchReader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default base directory of the store
pub const DEFAULT_BASE_DIR: &str = "./tmpdb";

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory of all partitions
    pub base_dir: PathBuf,
    /// Codec for newly written partitions
    pub compression: Compression,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            compression: Compression::default(),
        }
    }
}

/// Metadata of one partition file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionInfo {
    /// File path
    pub path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
    /// Row count from the file footer
    pub rows: u64,
    /// Column names
    pub columns: Vec<String>,
}

/// Parquet files partitioned by dataset, entity and fiscal year
#[derive(Debug, Clone)]
pub struct PartitionedStore {
    layout: StoreLayout,
    compression: Compression,
    listing: Arc<dyn PartitionListing>,
}

impl PartitionedStore {
    /// Create store from configuration, listing the local filesystem
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            layout: StoreLayout::new(&config.base_dir),
            compression: config.compression,
            listing: Arc::new(FsListing),
        }
    }

    /// Replace the partition discovery strategy
    #[must_use]
    pub fn with_listing(mut self, listing: Arc<dyn PartitionListing>) -> Self {
        self.listing = listing;
        self
    }

    /// Path layout
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Path of a partition, creating its directories
    ///
    /// # Errors
    /// `StoreError::InvalidKey` for an unusable prefix, `StoreError::Io` when
    /// the directories cannot be created.
    pub fn resolve_path(
        &self,
        prefix: &str,
        entity: impl Into<EntityCode>,
        year: FiscalYear,
    ) -> StoreResult<PathBuf> {
        let key = PartitionKey::new(prefix, entity, year)?;
        self.layout.resolve_path(&key)
    }

    /// Whether a partition file exists; never creates anything
    ///
    /// # Errors
    /// `StoreError::InvalidKey` for an unusable prefix.
    pub fn exists(
        &self,
        prefix: &str,
        entity: impl Into<EntityCode>,
        year: FiscalYear,
    ) -> StoreResult<bool> {
        let key = PartitionKey::new(prefix, entity, year)?;
        Ok(self.layout.partition_path(&key).is_file())
    }

    /// Writer for a partition; the file appears on the first non-empty write
    ///
    /// # Errors
    /// Same as [`PartitionedStore::resolve_path`].
    pub fn writer(
        &self,
        prefix: &str,
        entity: impl Into<EntityCode>,
        year: FiscalYear,
    ) -> StoreResult<PartitionWriter> {
        let path = self.resolve_path(prefix, entity, year)?;
        Ok(PartitionWriter::new(path).with_compression(self.compression))
    }

    /// Write one table as a whole partition, returning rows written
    ///
    /// An empty table writes nothing.
    ///
    /// # Errors
    /// Key, IO and Parquet errors from the underlying writer.
    pub fn write_table(
        &self,
        prefix: &str,
        entity: impl Into<EntityCode>,
        year: FiscalYear,
        table: &Table,
    ) -> StoreResult<usize> {
        let mut writer = self.writer(prefix, entity, year)?;
        writer.write(table)?;
        writer.close()?;
        Ok(writer.rows_written())
    }

    /// Read a single partition, optionally projecting `columns` in the
    /// given order
    ///
    /// # Errors
    /// Only key and directory errors; a missing or unreadable partition
    /// yields [`Table::Empty`].
    pub fn read_one(
        &self,
        prefix: &str,
        entity: impl Into<EntityCode>,
        year: FiscalYear,
        columns: Option<&[&str]>,
    ) -> StoreResult<Table> {
        let path = self.resolve_path(prefix, entity, year)?;
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "partition not found");
            return Ok(Table::Empty);
        }
        Ok(read_or_empty(&path, columns))
    }

    /// Read every partition of a dataset for a year
    ///
    /// The consolidated partition wins when it exists. Otherwise all entity
    /// partitions are concatenated with the union of their columns. A
    /// projection keeps every partition: requested columns a partition lacks
    /// read as nulls, and a column requested but present nowhere yields
    /// [`Table::Empty`]. Numeric columns widen across partitions; unreadable
    /// files and files whose column types cannot be reconciled are logged
    /// and skipped.
    ///
    /// # Errors
    /// Key and directory errors.
    pub fn read_all(
        &self,
        prefix: &str,
        year: FiscalYear,
        columns: Option<&[&str]>,
    ) -> StoreResult<Table> {
        let key = PartitionKey::consolidated(prefix, year)?;
        let consolidated = self.layout.resolve_path(&key)?;
        if consolidated.is_file() {
            tracing::debug!(path = %consolidated.display(), "reading consolidated partition");
            return Ok(read_or_empty(&consolidated, columns));
        }

        let dir = self.layout.partition_dir(prefix, year);
        let pattern = PartitionPattern::for_dataset(prefix, year);
        let files = self
            .listing
            .list(&dir, &pattern)
            .map_err(|e| StoreError::io_error(&dir, e))?;
        if files.is_empty() {
            tracing::debug!(dir = %dir.display(), "no partitions found");
            return Ok(Table::Empty);
        }

        let mut batches = Vec::with_capacity(files.len());
        let mut types = ColumnTypes::default();
        for file in &files {
            match read_file(file, columns, MissingColumns::Skip) {
                Ok(Table::Data(batch)) => match types.admit(&batch.schema()) {
                    Ok(()) => batches.push(batch),
                    Err(conflict) => {
                        tracing::warn!(
                            path = %file.display(),
                            %conflict,
                            "skipping partition with conflicting column type"
                        );
                    }
                },
                Ok(Table::Empty) => {}
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "skipping unreadable partition");
                }
            }
        }
        tracing::debug!(
            dir = %dir.display(),
            files = files.len(),
            read = batches.len(),
            "partitions combined"
        );

        let table = Table::union(&batches, &dir)?;
        match (columns, table) {
            (Some(columns), Table::Data(batch)) => Ok(match reorder(&batch, columns, &dir) {
                Ok(batch) => Table::Data(batch),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "projection not satisfied");
                    Table::Empty
                }
            }),
            (_, table) => Ok(table),
        }
    }

    /// Footer metadata of a partition, `None` when it does not exist
    ///
    /// # Errors
    /// Key errors, or IO / Parquet errors reading the footer.
    pub fn partition_info(
        &self,
        prefix: &str,
        entity: impl Into<EntityCode>,
        year: FiscalYear,
    ) -> StoreResult<Option<PartitionInfo>> {
        let key = PartitionKey::new(prefix, entity, year)?;
        let path = self.layout.partition_path(&key);
        if !path.is_file() {
            return Ok(None);
        }

        let file = File::open(&path).map_err(|e| StoreError::io_error(&path, e))?;
        let size_bytes = file
            .metadata()
            .map_err(|e| StoreError::io_error(&path, e))?
            .len();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let rows = u64::try_from(builder.metadata().file_metadata().num_rows()).unwrap_or(0);
        let columns = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();

        Ok(Some(PartitionInfo {
            path,
            size_bytes,
            rows,
            columns,
        }))
    }
}

fn read_or_empty(path: &Path, columns: Option<&[&str]>) -> Table {
    match read_file(path, columns, MissingColumns::Reject) {
        Ok(table) => table,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read partition");
            Table::Empty
        }
    }
}

/// How a projection treats requested columns a file lacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingColumns {
    Reject,
    /// Read the columns that exist; the caller aligns the rest
    Skip,
}

fn read_file(
    path: &Path,
    columns: Option<&[&str]>,
    missing: MissingColumns,
) -> StoreResult<Table> {
    let file = File::open(path).map_err(|e| StoreError::io_error(path, e))?;
    let mut builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    if let Some(columns) = columns {
        let schema = Arc::clone(builder.schema());
        let mut indices = Vec::with_capacity(columns.len());
        for column in columns {
            match schema.index_of(column) {
                Ok(index) => indices.push(index),
                Err(_) if missing == MissingColumns::Skip => {}
                Err(_) => {
                    return Err(StoreError::ColumnNotFound {
                        path: path.to_path_buf(),
                        column: (*column).to_string(),
                    })
                }
            }
        }
        if indices.is_empty() {
            // rows still count; their columns are filled in by the union
            let rows = usize::try_from(builder.metadata().file_metadata().num_rows()).unwrap_or(0);
            let options = RecordBatchOptions::new().with_row_count(Some(rows));
            let batch =
                RecordBatch::try_new_with_options(Arc::new(Schema::empty()), vec![], &options)?;
            return Ok(Table::Data(batch));
        }
        let mask = ProjectionMask::roots(builder.parquet_schema(), indices);
        builder = builder.with_projection(mask);
    }

    let reader = builder.build()?;
    let schema = reader.schema();
    let batches = reader.collect::<Result<Vec<_>, ArrowError>>()?;
    let batch = concat_batches(&schema, &batches)?;

    // projection yields file order; callers get the order they asked for
    let batch = match (columns, missing) {
        (Some(columns), MissingColumns::Reject) => reorder(&batch, columns, path)?,
        _ => batch,
    };
    Ok(Table::Data(batch))
}

fn reorder(batch: &RecordBatch, columns: &[&str], origin: &Path) -> StoreResult<RecordBatch> {
    let schema = batch.schema();
    let indices = columns
        .iter()
        .map(|column| {
            schema
                .index_of(column)
                .map_err(|_| StoreError::ColumnNotFound {
                    path: origin.to_path_buf(),
                    column: (*column).to_string(),
                })
        })
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(batch.project(&indices)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array};

    fn store(base: &Path) -> PartitionedStore {
        PartitionedStore::new(&StoreConfig {
            base_dir: base.to_path_buf(),
            compression: Compression::Snappy,
        })
    }

    fn year() -> FiscalYear {
        FiscalYear::new(2024).unwrap()
    }

    fn table(values: &[i64]) -> Table {
        let column: ArrayRef = Arc::new(Int64Array::from(values.to_vec()));
        Table::from(RecordBatch::try_from_iter(vec![("A", column)]).unwrap())
    }

    #[test]
    fn read_missing_partition_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        let table = store.read_one("s_anc", "10669", year(), None).unwrap();
        assert_eq!(table, Table::Empty);
    }

    #[test]
    fn exists_does_not_create_directories() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        assert!(!store.exists("s_anc", "10669", year()).unwrap());
        assert!(!temp.path().join("2024").exists());
    }

    #[test]
    fn corrupt_partition_reads_as_empty() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        let path = store.resolve_path("s_anc", "10669", year()).unwrap();
        std::fs::write(&path, b"not parquet").unwrap();

        let table = store.read_one("s_anc", "10669", year(), None).unwrap();
        assert_eq!(table, Table::Empty);
    }

    #[test]
    fn write_table_skips_empty() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        let rows = store
            .write_table("s_anc", "10669", year(), &Table::Empty)
            .unwrap();
        assert_eq!(rows, 0);
        assert!(!store.exists("s_anc", "10669", year()).unwrap());
    }

    #[test]
    fn partition_info_reads_footer() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(temp.path());
        assert!(store.partition_info("s_anc", "10669", year()).unwrap().is_none());

        store
            .write_table("s_anc", "10669", year(), &table(&[1, 2, 3]))
            .unwrap();
        let info = store.partition_info("s_anc", "10669", year()).unwrap().unwrap();
        assert_eq!(info.rows, 3);
        assert_eq!(info.columns, ["A"]);
        assert!(info.size_bytes > 0);
    }

    #[test]
    fn store_config_deserializes_with_defaults() {
        let config: StoreConfig = serde_json::from_str(r#"{"compression": "zstd"}"#).unwrap();
        assert_eq!(config.base_dir, PathBuf::from(DEFAULT_BASE_DIR));
        assert_eq!(config.compression, Compression::Zstd);
    }
}
