//! File argument expansion
//!
//! Arguments are glob-expanded here so quoting on the shell side does not
//! matter. An argument that matches nothing is an error unless it contains
//! `*`, in which case it simply contributes no files.

use std::path::{Path, PathBuf};

/// Input resolution errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Literal argument with no match
    #[error("{0}: file not found")]
    NotFound(String),

    /// Argument is not a valid glob pattern
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Nothing matched at all
    #[error("no files found")]
    NoFiles,
}

impl InputError {
    /// Whether this is a usage error rather than an empty input set
    #[must_use]
    pub fn is_usage(&self) -> bool {
        !matches!(self, Self::NoFiles)
    }
}

/// Expand file arguments in order
///
/// # Errors
/// `InputError::NotFound` / `InputError::Pattern` for bad arguments,
/// `InputError::NoFiles` when the combined result is empty.
pub fn expand_inputs<S: AsRef<str>>(args: &[S]) -> Result<Vec<PathBuf>, InputError> {
    let mut files = Vec::new();
    for arg in args {
        let arg = arg.as_ref();
        let before = files.len();
        let paths = glob::glob(arg).map_err(|source| InputError::Pattern {
            pattern: arg.to_string(),
            source,
        })?;
        for entry in paths {
            match entry {
                Ok(path) => files.push(path),
                Err(e) => tracing::warn!(error = %e, "unreadable path skipped"),
            }
        }
        if files.len() == before && !arg.contains('*') {
            return Err(InputError::NotFound(arg.to_string()));
        }
    }

    if files.is_empty() {
        return Err(InputError::NoFiles);
    }
    Ok(files)
}

/// Notebooks directly inside `dir`, sorted
///
/// # Errors
/// `InputError::NoFiles` when there are none (including a missing `dir`).
pub fn notebooks_in(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, InputError> {
    let pattern = format!(
        "{}/*.{extension}",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    expand_inputs(&[pattern])
}
