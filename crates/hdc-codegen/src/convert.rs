//! Plain notebook export
//!
//! Dumps every code cell in order, without templates or tag handling. Line
//! magics (`%time`, `%matplotlib inline`) are commented out so the result
//! runs outside a notebook kernel.

use crate::error::{CodegenError, CodegenResult};
use crate::generator::script_path;
use crate::notebook::{Notebook, NotebookParser};
use std::path::{Path, PathBuf};

/// Prefix of notebook magic lines
const MAGIC_PREFIX: char = '%';

/// Converts notebooks into plain scripts
#[derive(Debug, Clone, Copy, Default)]
pub struct NotebookConverter {
    parser: NotebookParser,
}

impl NotebookConverter {
    /// Create converter
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            parser: NotebookParser::new(),
        }
    }

    /// Script text for a parsed notebook
    ///
    /// Every cell contributes a trailing line break, code cells also their
    /// source.
    #[must_use]
    pub fn convert(&self, notebook: &Notebook) -> String {
        let mut out = String::new();
        for cell in &notebook.cells {
            if cell.is_code() {
                for line in cell.source.lines() {
                    if line.starts_with(MAGIC_PREFIX) {
                        out.push_str("# ");
                    }
                    out.push_str(&line);
                }
            }
            out.push('\n');
        }
        out
    }

    /// Convert a notebook file into `{out_dir}/{name}.py`, creating `out_dir`
    ///
    /// # Errors
    /// Notebook loading errors, or `CodegenError::Io` when writing fails.
    pub fn convert_file(&self, path: impl AsRef<Path>, out_dir: impl AsRef<Path>) -> CodegenResult<PathBuf> {
        let path = path.as_ref();
        let out_dir = out_dir.as_ref();
        let notebook = self.parser.load(path)?;

        std::fs::create_dir_all(out_dir).map_err(|e| CodegenError::io_error(out_dir, e))?;
        let target = script_path(out_dir, path);
        std::fs::write(&target, self.convert(&notebook))
            .map_err(|e| CodegenError::io_error(&target, e))?;
        tracing::info!(source = %path.display(), target = %target.display(), "notebook converted");
        Ok(target)
    }
}
