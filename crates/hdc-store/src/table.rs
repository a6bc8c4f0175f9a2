//! Tabular values exchanged with the store
//!
//! A [`Table`] is either absent ([`Table::Empty`]) or a single Arrow record
//! batch. Tables from several partitions are combined with
//! [`Table::union`], which takes the union of their columns and fills the
//! gaps with nulls.

use crate::error::{StoreError, StoreResult};
use arrow::array::{new_null_array, ArrayRef};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

/// Table read from or written to a partition
#[derive(Debug, Clone, Default)]
pub enum Table {
    /// No data (missing, unreadable or never written)
    #[default]
    Empty,
    /// Materialized rows
    Data(RecordBatch),
}

impl Table {
    /// Whether there are no rows to write or inspect
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Data(batch) => batch.num_rows() == 0,
        }
    }

    /// Row count
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch().map_or(0, RecordBatch::num_rows)
    }

    /// Column count
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.batch().map_or(0, RecordBatch::num_columns)
    }

    /// Column names in schema order
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.batch().map_or_else(Vec::new, |batch| {
            batch
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect()
        })
    }

    /// Schema, if any data is present
    #[must_use]
    pub fn schema(&self) -> Option<SchemaRef> {
        self.batch().map(RecordBatch::schema)
    }

    /// Underlying batch
    #[inline]
    #[must_use]
    pub fn batch(&self) -> Option<&RecordBatch> {
        match self {
            Self::Empty => None,
            Self::Data(batch) => Some(batch),
        }
    }

    /// Consume into the underlying batch
    #[inline]
    #[must_use]
    pub fn into_batch(self) -> Option<RecordBatch> {
        match self {
            Self::Empty => None,
            Self::Data(batch) => Some(batch),
        }
    }

    /// Combine batches into one table
    ///
    /// Columns are the union of all inputs in first-seen order; a column a
    /// batch lacks is filled with nulls for that batch's rows. Numeric
    /// columns of differing types are cast to their common type. No input
    /// yields [`Table::Empty`].
    ///
    /// # Errors
    /// `StoreError::SchemaMismatch` when two inputs disagree on a column's
    /// type and neither widens to the other, attributed to `origin`.
    pub fn union(batches: &[RecordBatch], origin: &Path) -> StoreResult<Self> {
        let Some(first) = batches.first() else {
            return Ok(Self::Empty);
        };
        if batches.len() == 1 {
            return Ok(Self::Data(first.clone()));
        }

        let schema = union_schema(batches, origin)?;
        let aligned = batches
            .iter()
            .map(|batch| align(batch, &schema))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Self::Data(concat_batches(&schema, &aligned)?))
    }
}

/// Value equality: same fields and column values
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Data(a), Self::Data(b)) => {
                a.schema().fields() == b.schema().fields() && a.columns() == b.columns()
            }
            _ => false,
        }
    }
}

impl From<RecordBatch> for Table {
    fn from(batch: RecordBatch) -> Self {
        Self::Data(batch)
    }
}

/// Merged column types of partitions admitted so far
#[derive(Debug, Default)]
pub(crate) struct ColumnTypes {
    types: IndexMap<String, DataType>,
}

impl ColumnTypes {
    /// Record `schema`'s columns, or describe the first conflict and record
    /// nothing
    pub(crate) fn admit(&mut self, schema: &Schema) -> Result<(), String> {
        let mut merged = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let data_type = match self.types.get(field.name()) {
                Some(existing) => widen(existing, field.data_type()).ok_or_else(|| {
                    format!("{}: {existing} vs {}", field.name(), field.data_type())
                })?,
                None => field.data_type().clone(),
            };
            merged.push((field.name().clone(), data_type));
        }
        self.types.extend(merged);
        Ok(())
    }
}

/// Common type of two column types
///
/// Integers widen to the larger integer, mixed integer and float to
/// `Float64`, and a null column adopts the other side's type.
pub(crate) fn widen(a: &DataType, b: &DataType) -> Option<DataType> {
    if a == b {
        return Some(a.clone());
    }
    match (a, b) {
        (DataType::Null, other) | (other, DataType::Null) => Some(other.clone()),
        _ => match (integer_rank(a), integer_rank(b)) {
            (Some(x), Some(y)) => Some(if x >= y { a.clone() } else { b.clone() }),
            _ if is_numeric(a) && is_numeric(b) => Some(DataType::Float64),
            _ => None,
        },
    }
}

fn integer_rank(data_type: &DataType) -> Option<u8> {
    match data_type {
        DataType::Int8 => Some(0),
        DataType::Int16 => Some(1),
        DataType::Int32 => Some(2),
        DataType::Int64 => Some(3),
        _ => None,
    }
}

fn is_numeric(data_type: &DataType) -> bool {
    integer_rank(data_type).is_some()
        || matches!(
            data_type,
            DataType::Float16 | DataType::Float32 | DataType::Float64
        )
}

fn union_schema(batches: &[RecordBatch], origin: &Path) -> StoreResult<SchemaRef> {
    let mut merged: IndexMap<String, Field> = IndexMap::new();
    for batch in batches {
        for field in batch.schema().fields() {
            match merged.get_mut(field.name()) {
                Some(existing) => {
                    let data_type =
                        widen(existing.data_type(), field.data_type()).ok_or_else(|| {
                            StoreError::schema_mismatch(
                                origin,
                                format!("{}: {}", existing.name(), existing.data_type()),
                                format!("{}: {}", field.name(), field.data_type()),
                            )
                        })?;
                    let nullable = existing.is_nullable() || field.is_nullable();
                    *existing = existing
                        .clone()
                        .with_data_type(data_type)
                        .with_nullable(nullable);
                }
                None => {
                    merged.insert(field.name().clone(), field.as_ref().clone());
                }
            }
        }
    }

    // columns missing from any input receive nulls
    for field in merged.values_mut() {
        let everywhere = batches
            .iter()
            .all(|batch| batch.schema().column_with_name(field.name()).is_some());
        if !everywhere {
            *field = field.clone().with_nullable(true);
        }
    }

    Ok(Arc::new(Schema::new(merged.into_values().collect::<Vec<_>>())))
}

fn align(batch: &RecordBatch, schema: &SchemaRef) -> StoreResult<RecordBatch> {
    let columns = schema
        .fields()
        .iter()
        .map(|field| match batch.column_by_name(field.name()) {
            Some(column) if column.data_type() == field.data_type() => Ok(Arc::clone(column)),
            Some(column) => cast(column, field.data_type()),
            None => Ok(new_null_array(field.data_type(), batch.num_rows())),
        })
        .collect::<Result<Vec<ArrayRef>, _>>()?;
    Ok(RecordBatch::try_new(Arc::clone(schema), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float64Array, Int32Array, Int64Array, StringArray};
    use proptest::prelude::*;

    fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
        RecordBatch::try_from_iter(columns).unwrap()
    }

    fn ints(values: &[i64]) -> ArrayRef {
        Arc::new(Int64Array::from(values.to_vec()))
    }

    fn strs(values: &[&str]) -> ArrayRef {
        Arc::new(StringArray::from(values.to_vec()))
    }

    #[test]
    fn empty_and_zero_row_tables_are_empty() {
        assert!(Table::Empty.is_empty());
        let zero = batch(vec![("A", ints(&[]))]);
        let table = Table::from(zero);
        assert!(table.is_empty());
        assert_eq!(table.column_names(), ["A"]);
    }

    #[test]
    fn union_of_nothing_is_empty() {
        assert_eq!(Table::union(&[], Path::new("d")).unwrap(), Table::Empty);
    }

    #[test]
    fn union_fills_missing_columns_with_nulls() {
        let a = batch(vec![("HOSPCODE", strs(&["10001"])), ("A", ints(&[1]))]);
        let b = batch(vec![("HOSPCODE", strs(&["20002"])), ("B", ints(&[2]))]);

        let table = Table::union(&[a, b], Path::new("d")).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column_names(), ["HOSPCODE", "A", "B"]);

        let combined = table.batch().unwrap();
        let col_a = combined.column_by_name("A").unwrap();
        let col_b = combined.column_by_name("B").unwrap();
        assert!(col_a.is_valid(0) && col_a.is_null(1));
        assert!(col_b.is_null(0) && col_b.is_valid(1));
        assert!(combined.schema().field_with_name("A").unwrap().is_nullable());
    }

    #[test]
    fn union_rejects_conflicting_types() {
        let a = batch(vec![("A", ints(&[1]))]);
        let b = batch(vec![("A", strs(&["x"]))]);
        let err = Table::union(&[a, b], Path::new("d")).unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { .. }));
    }

    #[test]
    fn equality_compares_values() {
        let a = Table::from(batch(vec![("A", ints(&[1, 2]))]));
        let b = Table::from(batch(vec![("A", ints(&[1, 2]))]));
        let c = Table::from(batch(vec![("A", ints(&[1, 3]))]));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Table::Empty);
        assert_eq!(
            a.schema().unwrap().field(0).data_type(),
            &DataType::Int64
        );
    }

    #[test]
    fn union_widens_numeric_columns() {
        let a = batch(vec![("A", Arc::new(Int32Array::from(vec![1])) as ArrayRef)]);
        let b = batch(vec![("A", ints(&[2]))]);
        let c = batch(vec![("A", Arc::new(Float64Array::from(vec![2.5])) as ArrayRef)]);

        let table = Table::union(&[a.clone(), b], Path::new("d")).unwrap();
        assert_eq!(table.schema().unwrap().field(0).data_type(), &DataType::Int64);

        let table = Table::union(&[a, c], Path::new("d")).unwrap();
        let combined = table.batch().unwrap();
        assert_eq!(combined.schema().field(0).data_type(), &DataType::Float64);
        let values = combined
            .column(0)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!((values.value(0) - 1.0).abs() < f64::EPSILON);
        assert!((values.value(1) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn column_types_reject_irreconcilable_partitions() {
        let mut types = ColumnTypes::default();
        let ints_schema = Schema::new(vec![Field::new("A", DataType::Int64, false)]);
        let floats_schema = Schema::new(vec![Field::new("A", DataType::Float64, true)]);
        let text_schema = Schema::new(vec![
            Field::new("B", DataType::Utf8, true),
            Field::new("A", DataType::Utf8, true),
        ]);

        assert!(types.admit(&ints_schema).is_ok());
        assert!(types.admit(&floats_schema).is_ok());
        assert!(types.admit(&text_schema).is_err());
        // a rejected schema leaves no trace
        assert!(!types.types.contains_key("B"));
        assert_eq!(types.types["A"], DataType::Float64);
    }

    #[test]
    fn widen_rules() {
        assert_eq!(widen(&DataType::Null, &DataType::Utf8), Some(DataType::Utf8));
        assert_eq!(widen(&DataType::Int8, &DataType::Int32), Some(DataType::Int32));
        assert_eq!(widen(&DataType::Float32, &DataType::Int64), Some(DataType::Float64));
        assert_eq!(widen(&DataType::Utf8, &DataType::Int64), None);
    }

    proptest! {
        #[test]
        fn union_keeps_every_row(sizes in prop::collection::vec(0usize..8, 1..6)) {
            let batches: Vec<RecordBatch> = sizes
                .iter()
                .enumerate()
                .map(|(i, &n)| {
                    let values: Vec<i64> = (0..n as i64).collect();
                    // alternate column sets so the union has gaps to fill
                    let name = if i % 2 == 0 { "A" } else { "B" };
                    batch(vec![("ID", ints(&values)), (name, ints(&values))])
                })
                .collect();

            let table = Table::union(&batches, Path::new("d")).unwrap();
            prop_assert_eq!(table.num_rows(), sizes.iter().sum::<usize>());
        }
    }
}
