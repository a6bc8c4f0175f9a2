//! Script generator
//!
//! Orchestrates notebook parsing, parameter filtering and template rendering.
//!
//! ```text
//! notebook.ipynb → NotebookParser → RoleBuckets ─┬─ parameters → ParameterFilter ─┐
//!                                                └─ process ──────────────────────┴→ TemplateEngine → script
//! ```

use crate::error::{CodegenError, CodegenResult};
use crate::notebook::{document_name, NotebookParser};
use crate::parameters::ParameterFilter;
use crate::template::{TemplateBundle, TemplateEngine, TemplateStore, TEMPLATE_EXTENSION};
use std::path::{Path, PathBuf};

/// Outcome of generating a script file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Script written to the given path
    Written(PathBuf),
    /// Notebook has no process cells; nothing written
    Skipped,
}

/// Notebook to script generator
#[derive(Debug, Clone, Default)]
pub struct CodeGenerator {
    parser: NotebookParser,
    filter: ParameterFilter,
    engine: TemplateEngine,
}

impl CodeGenerator {
    /// Create generator rendering through `engine`
    #[inline]
    #[must_use]
    pub fn new(engine: TemplateEngine) -> Self {
        Self {
            parser: NotebookParser::new(),
            filter: ParameterFilter::new(),
            engine,
        }
    }

    /// Create generator over a template store
    #[inline]
    #[must_use]
    pub fn with_store(store: TemplateStore) -> Self {
        Self::new(TemplateEngine::new(store))
    }

    /// Generate the script text for a notebook
    ///
    /// Returns an empty string when the notebook has no `process` cells; the
    /// caller must not write anything in that case.
    ///
    /// # Errors
    /// - `CodegenError::UnsupportedFormat` for non-notebook paths
    /// - `CodegenError::Io` / `CodegenError::InvalidDocument` for unreadable notebooks
    /// - `CodegenError::MissingTemplate` when no template can be found
    pub fn build(&self, path: impl AsRef<Path>, template: Option<&str>) -> CodegenResult<String> {
        let path = path.as_ref();
        let notebook = self.parser.load(path)?;
        let buckets = notebook.buckets();
        if !buckets.has_process() {
            tracing::debug!(path = %path.display(), "notebook has no process cells");
            return Ok(String::new());
        }

        let name = document_name(path);
        let parameters = self.filter.filter(&buckets.parameters, &name);
        let bundle = TemplateBundle::new(parameters.lines(), &buckets.process);
        self.engine.render(template, &bundle)
    }

    /// Generate a notebook's script into `out_dir` as `{name}.py`
    ///
    /// The directory must already exist. Nothing is written when the
    /// notebook has no process cells.
    ///
    /// # Errors
    /// Everything [`CodeGenerator::build`] returns, plus `CodegenError::Io`
    /// when the script cannot be written.
    pub fn write_script(
        &self,
        path: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
        template: Option<&str>,
    ) -> CodegenResult<BuildStatus> {
        let path = path.as_ref();
        let script = self.build(path, template)?;
        if script.is_empty() {
            return Ok(BuildStatus::Skipped);
        }

        let target = script_path(out_dir.as_ref(), path);
        std::fs::write(&target, script).map_err(|e| CodegenError::io_error(&target, e))?;
        tracing::info!(source = %path.display(), target = %target.display(), "script generated");
        Ok(BuildStatus::Written(target))
    }
}

/// Output path of the script generated for `notebook` inside `out_dir`
#[must_use]
pub fn script_path(out_dir: &Path, notebook: &Path) -> PathBuf {
    out_dir.join(format!("{}.{TEMPLATE_EXTENSION}", document_name(notebook)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_path_uses_document_name() {
        assert_eq!(
            script_path(Path::new("out"), Path::new("nb/s_anc.ipynb")),
            PathBuf::from("out/s_anc.py")
        );
    }

    #[test]
    fn build_rejects_non_notebooks_before_reading() {
        let generator = CodeGenerator::default();
        let err = generator.build("missing.txt", None).unwrap_err();
        assert!(matches!(err, CodegenError::UnsupportedFormat { .. }));
    }

    #[test]
    fn build_reports_unreadable_notebook() {
        let generator = CodeGenerator::default();
        let err = generator.build("/nonexistent/dir/missing.ipynb", None).unwrap_err();
        assert!(matches!(err, CodegenError::Io { .. }));
    }
}
