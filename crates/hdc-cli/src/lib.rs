//! HDC command line
//!
//! The `hdc` binary wires configuration, script generation, batch execution
//! and the partitioned store together:
//!
//! - `build` / `build-all`: notebooks → scripts through a template
//! - `convert`: notebooks → plain scripts
//! - `run`: execute scripts with bounded concurrency
//! - `inspect`: summarize a stored dataset
//!
//! Exit codes: `0` full success, `1` no input or any per-file failure,
//! `2` usage error.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod inputs;

pub use commands::CommandStatus;
pub use config::AppConfig;

use anyhow::Context;
use clap::ArgMatches;
use std::path::{Path, PathBuf};

/// Run the subcommand selected in `matches`
///
/// # Errors
/// Command-level failures that abort the whole invocation.
pub async fn dispatch(matches: &ArgMatches, config: &AppConfig) -> anyhow::Result<CommandStatus> {
    match matches.subcommand() {
        Some(("build", args)) => commands::build(
            config,
            &files(args),
            directory(args)?,
            args.get_one::<String>("template").map(String::as_str),
        ),
        Some(("build-all", args)) => {
            let source = args
                .get_one::<PathBuf>("source")
                .context("missing source directory")?;
            commands::build_all(
                config,
                source,
                directory(args)?,
                args.get_one::<String>("template").map(String::as_str),
                args.get_flag("clear"),
            )
        }
        Some(("convert", args)) => {
            commands::convert(&files(args), directory(args)?, args.get_flag("clear"))
        }
        Some(("run", args)) => {
            commands::run(config, &files(args), args.get_one::<usize>("workers").copied()).await
        }
        Some(("inspect", args)) => {
            let prefix = args.get_one::<String>("prefix").context("missing prefix")?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            commands::inspect(
                config,
                prefix,
                args.get_one::<String>("entity").map(String::as_str),
                args.get_one::<String>("year").map(String::as_str),
                &mut out,
            )
        }
        _ => Ok(CommandStatus::Usage),
    }
}

fn files(args: &ArgMatches) -> Vec<String> {
    args.get_many::<String>("files")
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn directory(args: &ArgMatches) -> anyhow::Result<&Path> {
    args.get_one::<PathBuf>("directory")
        .map(PathBuf::as_path)
        .context("missing output directory")
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
