//! Error types for script generation
//!
//! Covers the failure modes of:
//! - Notebook loading (wrong extension, unreadable file, malformed JSON)
//! - Template lookup (no named template and no default)
//!
//! A notebook without `process` cells is not an error: generation yields an
//! empty script and the caller skips it.

use std::path::PathBuf;

/// Errors raised while turning a notebook into a script
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// File is not a notebook document
    #[error("unsupported file format: {path} (expected .ipynb)")]
    UnsupportedFormat { path: PathBuf },

    /// Notebook JSON could not be decoded
    #[error("invalid notebook document {path}: {message}")]
    InvalidDocument { path: PathBuf, message: String },

    /// IO error while reading a notebook or template, or writing a script
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither the requested template nor the default one could be found
    #[error("template not found: '{name}' and no default template is available")]
    MissingTemplate { name: String },
}

impl CodegenError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create invalid document error for path
    pub fn invalid_document(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether a batch should skip this file silently rather than count it as failed
    #[inline]
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. })
    }
}

/// Result type alias for generation operations
pub type CodegenResult<T> = Result<T, CodegenError>;
