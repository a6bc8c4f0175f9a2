//! Notebook document parser
//!
//! Uses serde_json to decode nbformat documents and sorts tagged code cells
//! into the two role buckets consumed by the generator.

use crate::error::{CodegenError, CodegenResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File extension of notebook documents (without dot)
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

/// Tag marking a cell as processing code
pub const PROCESS_TAG: &str = "process";

/// Tags marking a cell as parameter declarations
pub const PARAMETER_TAGS: [&str; 3] = ["parameters", "param", "params"];

/// Cell type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    /// Executable code cell
    Code,
    /// Markdown, raw, or anything else
    #[serde(other)]
    Other,
}

/// Cell metadata; only tags are of interest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMetadata {
    /// Cell tags, empty when absent
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Cell source, stored either as a line list or as one string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellSource {
    /// One entry per line, each keeping its trailing newline
    Lines(Vec<String>),
    /// Whole cell as a single string
    Text(String),
}

impl Default for CellSource {
    fn default() -> Self {
        Self::Lines(Vec::new())
    }
}

impl CellSource {
    /// Source lines in order, terminators preserved
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Lines(lines) => lines.clone(),
            Self::Text(text) => text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }
}

/// Role a code cell plays in generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRole {
    /// Parameter declarations
    Parameters,
    /// Processing code
    Process,
}

/// Single notebook cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Type discriminator
    pub cell_type: CellType,
    /// Metadata (tags)
    #[serde(default)]
    pub metadata: CellMetadata,
    /// Source lines
    #[serde(default)]
    pub source: CellSource,
}

impl Cell {
    /// Whether this is a code cell
    #[inline]
    #[must_use]
    pub fn is_code(&self) -> bool {
        self.cell_type == CellType::Code
    }

    /// Role derived from tags; `process` wins over parameter tags
    #[must_use]
    pub fn role(&self) -> Option<CellRole> {
        if !self.is_code() {
            return None;
        }
        let tags = &self.metadata.tags;
        if tags.iter().any(|t| t == PROCESS_TAG) {
            Some(CellRole::Process)
        } else if tags.iter().any(|t| PARAMETER_TAGS.contains(&t.as_str())) {
            Some(CellRole::Parameters)
        } else {
            None
        }
    }
}

/// Parsed notebook document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    /// Cells in document order
    pub cells: Vec<Cell>,
}

impl Notebook {
    /// Decode notebook JSON
    ///
    /// # Errors
    /// Returns the serde error when the text is not a notebook document.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Code cells in document order
    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_code())
    }

    /// Collect tagged source lines into role buckets
    #[must_use]
    pub fn buckets(&self) -> RoleBuckets {
        let mut buckets = RoleBuckets::default();
        for cell in self.code_cells() {
            match cell.role() {
                Some(CellRole::Process) => buckets.process.extend(cell.source.lines()),
                Some(CellRole::Parameters) => buckets.parameters.extend(cell.source.lines()),
                None => {}
            }
        }
        buckets
    }
}

/// Source lines grouped by role, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleBuckets {
    /// Lines from parameter-tagged cells
    pub parameters: Vec<String>,
    /// Lines from process-tagged cells
    pub process: Vec<String>,
}

impl RoleBuckets {
    /// Whether there is any processing code to generate from
    #[inline]
    #[must_use]
    pub fn has_process(&self) -> bool {
        !self.process.is_empty()
    }
}

/// Notebook parser
#[derive(Debug, Clone, Copy, Default)]
pub struct NotebookParser;

impl NotebookParser {
    /// Create new notebook parser
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Supported file extensions (without dot)
    #[must_use]
    pub fn extensions(&self) -> &[&str] {
        &[NOTEBOOK_EXTENSION]
    }

    /// Check if this parser can handle the given path
    #[must_use]
    pub fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions().contains(&ext))
            .unwrap_or(false)
    }

    /// Parse notebook text; `path` is only used for error reporting
    ///
    /// # Errors
    /// `CodegenError::InvalidDocument` when the JSON is malformed or not a notebook.
    pub fn parse(&self, content: &str, path: &Path) -> CodegenResult<Notebook> {
        Notebook::from_json(content)
            .map_err(|e| CodegenError::invalid_document(path, format!("JSON parse error: {e}")))
    }

    /// Read and parse a notebook file
    ///
    /// # Errors
    /// - `CodegenError::UnsupportedFormat` if the extension is not `.ipynb`
    /// - `CodegenError::Io` if the file cannot be read
    /// - `CodegenError::InvalidDocument` if the content is malformed
    pub fn load(&self, path: impl AsRef<Path>) -> CodegenResult<Notebook> {
        let path = path.as_ref();
        if !self.can_parse(path) {
            return Err(CodegenError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| CodegenError::io_error(path, e))?;
        let notebook = self.parse(&content, path)?;
        tracing::debug!(path = %path.display(), cells = notebook.cells.len(), "parsed notebook");
        Ok(notebook)
    }
}

/// Document base name without the notebook extension
///
/// `reports/s_anc.ipynb` → `s_anc`
#[must_use]
pub fn document_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
