//! Partition file discovery

use crate::layout::PartitionPattern;
use std::fmt;
use std::path::{Path, PathBuf};

/// Lists partition files in a dataset directory
///
/// Implementations return paths in name order; a missing directory lists
/// as empty.
pub trait PartitionListing: Send + Sync + fmt::Debug {
    /// Files directly under `dir` whose names match `pattern`
    ///
    /// # Errors
    /// IO errors other than the directory not existing.
    fn list(&self, dir: &Path, pattern: &PartitionPattern) -> std::io::Result<Vec<PathBuf>>;
}

/// Local filesystem listing
#[derive(Debug, Clone, Copy, Default)]
pub struct FsListing;

impl PartitionListing for FsListing {
    fn list(&self, dir: &Path, pattern: &PartitionPattern) -> std::io::Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let matched = entry
                .file_name()
                .to_str()
                .is_some_and(|name| pattern.matches(name));
            if matched {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}
