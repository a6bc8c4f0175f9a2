//! Subcommand implementations
//!
//! File-level failures are logged and counted so the rest of a batch still
//! runs; the returned [`CommandStatus`] reflects whether anything failed.

use crate::config::AppConfig;
use crate::inputs::{expand_inputs, notebooks_in, InputError};
use anyhow::Context;
use hdc_codegen::notebook::NOTEBOOK_EXTENSION;
use hdc_codegen::{BuildStatus, CodeGenerator, CodegenError, NotebookConverter};
use hdc_runner::{BatchRunner, ScriptTask};
use hdc_store::{EntityCode, FiscalYear};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Process exit status of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Everything succeeded
    Success,
    /// No input, or at least one file or task failed
    Failure,
    /// Bad arguments
    Usage,
}

impl CommandStatus {
    /// Process exit code
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Usage => 2,
        }
    }
}

/// Per-file counts of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTally {
    /// Outputs written
    pub written: usize,
    /// Inputs skipped without error
    pub skipped: usize,
    /// Inputs that failed
    pub failed: usize,
}

impl FileTally {
    fn status(self) -> CommandStatus {
        if self.failed == 0 {
            CommandStatus::Success
        } else {
            CommandStatus::Failure
        }
    }
}

fn resolve(inputs: Result<Vec<PathBuf>, InputError>) -> Result<Vec<PathBuf>, CommandStatus> {
    inputs.map_err(|e| {
        tracing::error!("{e}");
        if e.is_usage() {
            CommandStatus::Usage
        } else {
            CommandStatus::Failure
        }
    })
}

/// `build`: generate scripts for the given notebooks into `out_dir`
///
/// `out_dir` is created only once at least one input resolved.
///
/// # Errors
/// Directory creation failures and a missing default template.
pub fn build(
    config: &AppConfig,
    files: &[String],
    out_dir: &Path,
    template: Option<&str>,
) -> anyhow::Result<CommandStatus> {
    let paths = match resolve(expand_inputs(files)) {
        Ok(paths) => paths,
        Err(status) => return Ok(status),
    };
    generate(config, &paths, out_dir, template)
}

/// `build-all`: generate scripts for every notebook in `source_dir`
///
/// # Errors
/// Same as [`build`].
pub fn build_all(
    config: &AppConfig,
    source_dir: &Path,
    out_dir: &Path,
    template: Option<&str>,
    clear: bool,
) -> anyhow::Result<CommandStatus> {
    let paths = match resolve(notebooks_in(source_dir, NOTEBOOK_EXTENSION)) {
        Ok(paths) => paths,
        Err(status) => return Ok(status),
    };
    if clear {
        clear_dir(out_dir);
    }
    generate(config, &paths, out_dir, template)
}

fn generate(
    config: &AppConfig,
    paths: &[PathBuf],
    out_dir: &Path,
    template: Option<&str>,
) -> anyhow::Result<CommandStatus> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;
    let generator = CodeGenerator::with_store(config.template_store());

    let mut tally = FileTally::default();
    for path in paths {
        match generator.write_script(path, out_dir, template) {
            Ok(BuildStatus::Written(_)) => tally.written += 1,
            Ok(BuildStatus::Skipped) => {
                tracing::warn!(path = %path.display(), "no process cells, nothing generated");
                tally.skipped += 1;
            }
            Err(e) if e.is_skippable() => {
                tracing::warn!(path = %path.display(), "not a notebook, skipped");
                tally.skipped += 1;
            }
            Err(e @ CodegenError::MissingTemplate { .. }) => return Err(e.into()),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "build failed");
                tally.failed += 1;
            }
        }
    }

    tracing::info!(
        written = tally.written,
        skipped = tally.skipped,
        failed = tally.failed,
        "build finished"
    );
    Ok(tally.status())
}

/// `convert`: export notebooks as plain scripts into `out_dir`
///
/// # Errors
/// Never for per-file problems; those are counted.
pub fn convert(files: &[String], out_dir: &Path, clear: bool) -> anyhow::Result<CommandStatus> {
    let paths = match resolve(expand_inputs(files)) {
        Ok(paths) => paths,
        Err(status) => return Ok(status),
    };
    if clear {
        clear_dir(out_dir);
    }

    let converter = NotebookConverter::new();
    let mut tally = FileTally::default();
    for path in &paths {
        match converter.convert_file(path, out_dir) {
            Ok(_) => tally.written += 1,
            Err(e) if e.is_skippable() => {
                tracing::warn!(path = %path.display(), "not a notebook, skipped");
                tally.skipped += 1;
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "convert failed");
                tally.failed += 1;
            }
        }
    }

    tracing::info!(
        written = tally.written,
        skipped = tally.skipped,
        failed = tally.failed,
        "convert finished"
    );
    Ok(tally.status())
}

/// `run`: execute scripts with `workers` parallel processes
///
/// # Errors
/// Zero workers, or a runner-internal fault.
pub async fn run(
    config: &AppConfig,
    files: &[String],
    workers: Option<usize>,
) -> anyhow::Result<CommandStatus> {
    let paths = match resolve(expand_inputs(files)) {
        Ok(paths) => paths,
        Err(status) => return Ok(status),
    };

    let workers = workers.unwrap_or(config.runner.workers);
    let runner = BatchRunner::new(Arc::new(config.executor()), workers)?;
    let tasks = paths.into_iter().map(ScriptTask::new).collect();
    let report = runner.run(tasks).await?;

    Ok(if report.is_success() {
        CommandStatus::Success
    } else {
        CommandStatus::Failure
    })
}

/// `inspect`: print a summary of a stored dataset to `out`
///
/// Without `entity`, the consolidated partition is described when present,
/// otherwise the union of all entity partitions.
///
/// # Errors
/// Unparseable or unconfigured fiscal year, store errors, write errors.
pub fn inspect(
    config: &AppConfig,
    prefix: &str,
    entity: Option<&str>,
    year: Option<&str>,
    out: &mut impl Write,
) -> anyhow::Result<CommandStatus> {
    let year: FiscalYear = match year {
        Some(year) => year.parse()?,
        None => config
            .default
            .budget_year
            .context("no fiscal year: pass --year or set [default] budget_year")?,
    };
    let entity = entity.map_or_else(EntityCode::all, EntityCode::from);
    let store = config.partitioned_store();

    if let Some(info) = store.partition_info(prefix, entity.clone(), year)? {
        write_summary(
            out,
            &info.path.display().to_string(),
            Some(info.size_bytes),
            &info.columns,
            info.rows,
        )?;
        return Ok(CommandStatus::Success);
    }

    if !entity.is_all() {
        tracing::error!(prefix, %entity, %year, "partition not found");
        return Ok(CommandStatus::Failure);
    }

    let table = store.read_all(prefix, year, None)?;
    if table.num_columns() == 0 {
        tracing::error!(prefix, %year, "no partitions found");
        return Ok(CommandStatus::Failure);
    }
    let rows = u64::try_from(table.num_rows()).unwrap_or(u64::MAX);
    write_summary(out, prefix, None, &table.column_names(), rows)?;
    Ok(CommandStatus::Success)
}

fn write_summary(
    out: &mut impl Write,
    filename: &str,
    size_bytes: Option<u64>,
    columns: &[String],
    rows: u64,
) -> std::io::Result<()> {
    writeln!(out, "Filename: {filename}")?;
    if let Some(size) = size_bytes {
        #[allow(clippy::cast_precision_loss)]
        let megabytes = size as f64 / 1024.0 / 1024.0;
        writeln!(out, "Filesize: {megabytes:.2}MB")?;
    }
    writeln!(out, "Columns: {}", columns.join(","))?;
    writeln!(out, "Recordtotal: {}", group_thousands(rows))
}

/// `1234567` → `1,234,567`
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Remove everything inside `dir`, keeping `dir` itself
fn clear_dir(dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(e) = removed {
            tracing::warn!(path = %path.display(), error = %e, "failed to delete");
        }
    }
    tracing::debug!(dir = %dir.display(), "output directory cleared");
}
