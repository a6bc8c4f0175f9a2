//! Testing utilities for HDC workspace
//!
//! Notebook fixtures and sample tables shared by crate tests.

#![allow(missing_docs)]

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use hdc_store::{FiscalYear, PartitionedStore, StoreConfig, Table};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builds nbformat 4 documents cell by cell
#[derive(Debug, Clone, Default)]
pub struct NotebookBuilder {
    cells: Vec<Value>,
}

impl NotebookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code cell with tags; `source` is split into nbformat line entries
    pub fn code(mut self, tags: &[&str], source: &str) -> Self {
        self.cells.push(json!({
            "cell_type": "code",
            "execution_count": null,
            "metadata": { "tags": tags },
            "outputs": [],
            "source": source_lines(source),
        }));
        self
    }

    /// Code cell with no metadata tags at all
    pub fn untagged(mut self, source: &str) -> Self {
        self.cells.push(json!({
            "cell_type": "code",
            "execution_count": null,
            "metadata": {},
            "outputs": [],
            "source": source_lines(source),
        }));
        self
    }

    pub fn parameters(self, source: &str) -> Self {
        self.code(&["parameters"], source)
    }

    pub fn process(self, source: &str) -> Self {
        self.code(&["process"], source)
    }

    pub fn markdown(mut self, source: &str) -> Self {
        self.cells.push(json!({
            "cell_type": "markdown",
            "metadata": {},
            "source": source_lines(source),
        }));
        self
    }

    pub fn to_json(&self) -> String {
        json!({
            "cells": self.cells,
            "metadata": { "kernelspec": { "name": "python3", "language": "python" } },
            "nbformat": 4,
            "nbformat_minor": 5,
        })
        .to_string()
    }

    /// Write as `{dir}/{name}.ipynb`
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{name}.ipynb"));
        std::fs::write(&path, self.to_json()).unwrap();
        path
    }
}

fn source_lines(source: &str) -> Vec<String> {
    source.split_inclusive('\n').map(str::to_string).collect()
}

/// Table with `HOSPCODE` and `TOTAL` columns
pub fn hosp_table(hospcodes: &[&str], totals: &[i64]) -> Table {
    let hospcode: ArrayRef = Arc::new(StringArray::from(hospcodes.to_vec()));
    let total: ArrayRef = Arc::new(Int64Array::from(totals.to_vec()));
    Table::from(RecordBatch::try_from_iter(vec![("HOSPCODE", hospcode), ("TOTAL", total)]).unwrap())
}

/// Table with a single Int64 column
pub fn int_table(column: &str, values: &[i64]) -> Table {
    let array: ArrayRef = Arc::new(Int64Array::from(values.to_vec()));
    Table::from(RecordBatch::try_from_iter(vec![(column, array)]).unwrap())
}

pub fn fiscal_year(year: u16) -> FiscalYear {
    FiscalYear::new(year).unwrap()
}

/// Store rooted in a fresh temporary directory
pub fn temp_store() -> (tempfile::TempDir, PartitionedStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = PartitionedStore::new(&StoreConfig {
        base_dir: dir.path().to_path_buf(),
        ..StoreConfig::default()
    });
    (dir, store)
}
