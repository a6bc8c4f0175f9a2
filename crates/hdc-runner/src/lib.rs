//! HDC Batch Runner
//!
//! Executes generated scripts with bounded concurrency and aggregates the
//! results. Task failures are isolated: they are timed, logged and counted,
//! never propagated as errors.
//!
//! # Example
//!
//! ```rust,ignore
//! use hdc_runner::{BatchRunner, ProcessExecutor, ScriptTask};
//! use std::sync::Arc;
//!
//! let runner = BatchRunner::new(Arc::new(ProcessExecutor::default()), 4)?;
//! let report = runner.run(vec![ScriptTask::new("output/s_anc.py")]).await?;
//! if !report.is_success() {
//!     std::process::exit(1);
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod executor;
pub mod runner;
pub mod task;

// Re-exports for convenience
pub use error::{RunnerError, RunnerResult};
pub use executor::{ProcessExecutor, TaskExecutor, DEFAULT_INTERPRETER};
pub use runner::BatchRunner;
pub use task::{BatchReport, ScriptTask, TaskOutcome, TaskStatus};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
