//! On-disk layout
//!
//! ```text
//! {base_dir}/{year}/{prefix}/{prefix}_{entity}_{year}.parquet
//! ```

use crate::error::{StoreError, StoreResult};
use crate::key::{FiscalYear, PartitionKey, PARTITION_EXTENSION};
use std::path::{Path, PathBuf};

/// Maps partition keys to paths under a base directory
#[derive(Debug, Clone)]
pub struct StoreLayout {
    base_dir: PathBuf,
}

impl StoreLayout {
    /// Create layout rooted at `base_dir`
    #[inline]
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Base directory
    #[inline]
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding every partition of `prefix` for `year`
    #[must_use]
    pub fn partition_dir(&self, prefix: &str, year: FiscalYear) -> PathBuf {
        self.base_dir.join(year.to_string()).join(prefix)
    }

    /// Path of a partition file, without touching the filesystem
    #[must_use]
    pub fn partition_path(&self, key: &PartitionKey) -> PathBuf {
        self.partition_dir(key.prefix(), key.year())
            .join(key.file_name())
    }

    /// Path of a partition file, creating its parent directories
    ///
    /// Safe to call concurrently for the same key.
    ///
    /// # Errors
    /// `StoreError::Io` when the directories cannot be created.
    pub fn resolve_path(&self, key: &PartitionKey) -> StoreResult<PathBuf> {
        let dir = self.partition_dir(key.prefix(), key.year());
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io_error(&dir, e))?;
        Ok(dir.join(key.file_name()))
    }
}

/// File name pattern `{prefix}_*_{year}.parquet` split at the wildcard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPattern {
    /// Text before the wildcard
    pub head: String,
    /// Text after the wildcard
    pub tail: String,
}

impl PartitionPattern {
    /// Pattern matching every entity partition of `prefix` for `year`
    #[must_use]
    pub fn for_dataset(prefix: &str, year: FiscalYear) -> Self {
        Self {
            head: format!("{prefix}_"),
            tail: format!("_{year}.{PARTITION_EXTENSION}"),
        }
    }

    /// Whether `file_name` matches; the wildcard may be empty
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.len() >= self.head.len() + self.tail.len()
            && file_name.starts_with(&self.head)
            && file_name.ends_with(&self.tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn year() -> FiscalYear {
        FiscalYear::new(2024).unwrap()
    }

    #[test]
    fn partition_path_layout() {
        let layout = StoreLayout::new("/data/tmpdb");
        let key = PartitionKey::new("s_anc", "10669", year()).unwrap();
        assert_eq!(
            layout.partition_path(&key),
            PathBuf::from("/data/tmpdb/2024/s_anc/s_anc_10669_2024.parquet")
        );
    }

    #[test]
    fn resolve_path_creates_directories() {
        let temp = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(temp.path());
        let key = PartitionKey::new("s_anc", "10669", year()).unwrap();

        let path = layout.resolve_path(&key).unwrap();
        assert!(path.parent().unwrap().is_dir());
        assert!(!path.exists());

        // idempotent
        assert_eq!(layout.resolve_path(&key).unwrap(), path);
    }

    #[test]
    fn pattern_matches_entity_partitions_only() {
        let pattern = PartitionPattern::for_dataset("s_anc", year());
        assert!(pattern.matches("s_anc_10669_2024.parquet"));
        assert!(pattern.matches("s_anc__all__2024.parquet"));
        assert!(pattern.matches("s_anc__2024.parquet"));
        assert!(!pattern.matches("s_anc_2024.parquet"));
        assert!(!pattern.matches("s_anc_10669_2023.parquet"));
        assert!(!pattern.matches("s_anc_10669_2024.csv"));
        assert!(!pattern.matches("other_10669_2024.parquet"));
    }

    proptest! {
        #[test]
        fn pattern_matches_every_key_of_its_dataset(
            prefix in "[a-z][a-z_]{0,10}",
            entity in "[0-9]{5}|_all_",
            y in 1000u16..=9999,
        ) {
            let year = FiscalYear::new(y).unwrap();
            let key = PartitionKey::new(prefix.as_str(), entity.as_str(), year).unwrap();
            prop_assert!(PartitionPattern::for_dataset(&prefix, year).matches(&key.file_name()));

            let other_year = FiscalYear::new(if y == 9999 { 1000 } else { y + 1 }).unwrap();
            prop_assert!(!PartitionPattern::for_dataset(&prefix, other_year).matches(&key.file_name()));
        }
    }
}
