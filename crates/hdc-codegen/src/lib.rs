//! HDC Script Generation
//!
//! Turns tagged notebooks into standalone, parameterized scripts.
//!
//! # Core Operations
//!
//! - **Parse**: decode `.ipynb` documents and bucket tagged code cells
//!   (`parameters`/`param`/`params` and `process`)
//! - **Filter**: drop context-supplied parameters, guarantee `output_filename`
//! - **Render**: substitute both buckets into a named template
//!
//! # Example
//!
//! ```rust,ignore
//! use hdc_codegen::{CodeGenerator, TemplateStore};
//!
//! let generator = CodeGenerator::with_store(TemplateStore::with_dir("templates"));
//! let script = generator.build("notebooks/s_anc.ipynb", Some("by_hospcode"))?;
//! if script.is_empty() {
//!     // no process cells: nothing to generate
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod convert;
pub mod error;
pub mod generator;
pub mod notebook;
pub mod parameters;
pub mod template;

// Re-exports for convenience
pub use convert::NotebookConverter;
pub use error::{CodegenError, CodegenResult};
pub use generator::{script_path, BuildStatus, CodeGenerator};
pub use notebook::{Cell, CellRole, CellType, Notebook, NotebookParser, RoleBuckets};
pub use parameters::{ParameterFilter, ParameterSet, DENY_LIST, OUTPUT_FILENAME};
pub use template::{
    Placeholder, Template, TemplateBundle, TemplateEngine, TemplateStore, DEFAULT_TEMPLATE,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
