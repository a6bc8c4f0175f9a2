//! Command line definition

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Default output directory of `build` and `build-all`
pub const DEFAULT_BUILD_DIR: &str = "./output";
/// Default output directory of `convert`
pub const DEFAULT_CONVERT_DIR: &str = "./toutput";

fn files_arg() -> Arg {
    Arg::new("files")
        .num_args(0..)
        .action(ArgAction::Append)
        .help("Input files; glob patterns are expanded")
}

fn directory_arg(default: &'static str) -> Arg {
    Arg::new("directory")
        .short('d')
        .long("directory")
        .default_value(default)
        .value_parser(value_parser!(PathBuf))
        .help("Output directory")
}

fn template_arg() -> Arg {
    Arg::new("template")
        .short('t')
        .long("template")
        .help("Template name (falls back to the configured default)")
}

fn clear_arg() -> Arg {
    Arg::new("clear")
        .long("clear")
        .action(ArgAction::SetTrue)
        .help("Empty the output directory first")
}

/// Build the `hdc` command tree
#[must_use]
pub fn command() -> Command {
    Command::new("hdc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate, run and inspect HDC processing scripts")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (defaults to $CONFIG_FILE, then ./config.toml)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
        .subcommand(
            Command::new("build")
                .about("Generate scripts from tagged notebooks")
                .arg(files_arg())
                .arg(directory_arg(DEFAULT_BUILD_DIR))
                .arg(template_arg()),
        )
        .subcommand(
            Command::new("build-all")
                .about("Generate scripts for every notebook in a directory")
                .arg(
                    Arg::new("source")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory containing notebooks"),
                )
                .arg(directory_arg(DEFAULT_BUILD_DIR))
                .arg(template_arg())
                .arg(clear_arg()),
        )
        .subcommand(
            Command::new("convert")
                .about("Export notebooks as plain scripts")
                .arg(files_arg())
                .arg(directory_arg(DEFAULT_CONVERT_DIR))
                .arg(clear_arg()),
        )
        .subcommand(
            Command::new("run")
                .about("Execute generated scripts")
                .arg(files_arg())
                .arg(
                    Arg::new("workers")
                        .short('w')
                        .long("workers")
                        .value_parser(value_parser!(usize))
                        .help("Number of workers (defaults to the configured value)"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Summarize a stored dataset")
                .arg(Arg::new("prefix").required(true).help("Dataset prefix"))
                .arg(
                    Arg::new("entity")
                        .long("entity")
                        .help("Entity code (defaults to all entities)"),
                )
                .arg(
                    Arg::new("year")
                        .long("year")
                        .help("Fiscal year (defaults to the configured budget year)"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn build_defaults() {
        let matches = command().get_matches_from(["hdc", "build", "a.ipynb", "b.ipynb"]);
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "build");
        let files: Vec<_> = args.get_many::<String>("files").unwrap().collect();
        assert_eq!(files, ["a.ipynb", "b.ipynb"]);
        assert_eq!(
            args.get_one::<PathBuf>("directory"),
            Some(&PathBuf::from(DEFAULT_BUILD_DIR))
        );
        assert!(args.get_one::<String>("template").is_none());
    }

    #[test]
    fn global_flags_reach_subcommand() {
        let matches = command().get_matches_from(["hdc", "--config", "c.toml", "inspect", "s_anc"]);
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(args.get_one::<PathBuf>("config"), Some(&PathBuf::from("c.toml")));
        assert!(!args.get_flag("verbose"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let matches =
            command().get_matches_from(["hdc", "run", "-w", "4", "x.py", "--verbose"]);
        let (_, args) = matches.subcommand().unwrap();
        assert!(args.get_flag("verbose"));
        assert_eq!(args.get_one::<usize>("workers"), Some(&4));
    }
}
