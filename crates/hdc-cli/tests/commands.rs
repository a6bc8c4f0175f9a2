//! Subcommands against temporary directories

use hdc_cli::commands::{self, CommandStatus};
use hdc_cli::config::{AppConfig, CodegenConfig, RunnerConfig};
use hdc_store::{StoreConfig, ALL_ENTITIES};
use hdc_test_utils::{fiscal_year, hosp_table, NotebookBuilder};
use pretty_assertions::assert_eq;
use std::path::Path;

fn pattern(dir: &Path, glob: &str) -> String {
    format!("{}/{glob}", dir.display())
}

fn process_notebook(dir: &Path, name: &str) -> String {
    NotebookBuilder::new()
        .parameters("limit = 10\n")
        .process("x = limit\n")
        .write(dir, name)
        .display()
        .to_string()
}

#[test]
fn build_with_no_matching_files_fails_without_creating_output() {
    let temp = tempfile::tempdir().unwrap();
    let out_dir = temp.path().join("output");

    let status = commands::build(
        &AppConfig::default(),
        &[pattern(temp.path(), "*.ipynb")],
        &out_dir,
        None,
    )
    .unwrap();
    assert_eq!(status, CommandStatus::Failure);
    assert_eq!(status.code(), 1);
    assert!(!out_dir.exists());

    let status = commands::build(&AppConfig::default(), &[], &out_dir, None).unwrap();
    assert_eq!(status, CommandStatus::Failure);
    assert!(!out_dir.exists());
}

#[test]
fn build_with_missing_literal_is_usage_error() {
    let temp = tempfile::tempdir().unwrap();
    let out_dir = temp.path().join("output");

    let status = commands::build(
        &AppConfig::default(),
        &[pattern(temp.path(), "absent.ipynb")],
        &out_dir,
        None,
    )
    .unwrap();
    assert_eq!(status, CommandStatus::Usage);
    assert!(!out_dir.exists());
}

#[test]
fn build_continues_past_bad_notebooks() {
    let temp = tempfile::tempdir().unwrap();
    let src = temp.path().join("nb");
    std::fs::create_dir(&src).unwrap();
    process_notebook(&src, "a_good");
    process_notebook(&src, "c_good");
    std::fs::write(src.join("b_broken.ipynb"), "{").unwrap();
    NotebookBuilder::new()
        .parameters("x = 1\n")
        .write(&src, "d_no_process");
    let out_dir = temp.path().join("output");

    let status = commands::build(
        &AppConfig::default(),
        &[pattern(&src, "*.ipynb")],
        &out_dir,
        None,
    )
    .unwrap();

    assert_eq!(status, CommandStatus::Failure);
    assert!(out_dir.join("a_good.py").is_file());
    assert!(out_dir.join("c_good.py").is_file());
    assert!(!out_dir.join("b_broken.py").exists());
    assert!(!out_dir.join("d_no_process.py").exists());
}

#[test]
fn build_skips_unsupported_files_and_notebooks_without_process() {
    let temp = tempfile::tempdir().unwrap();
    let notes = temp.path().join("notes.txt");
    std::fs::write(&notes, "hello").unwrap();
    let good = process_notebook(temp.path(), "s_anc");
    let empty = NotebookBuilder::new()
        .markdown("# nothing to run")
        .write(temp.path(), "s_empty")
        .display()
        .to_string();
    let out_dir = temp.path().join("output");

    let status = commands::build(
        &AppConfig::default(),
        &[notes.display().to_string(), good, empty],
        &out_dir,
        Some("process_summary"),
    )
    .unwrap();

    assert_eq!(status, CommandStatus::Success);
    let script = std::fs::read_to_string(out_dir.join("s_anc.py")).unwrap();
    assert!(script.contains("output_filename = 's_anc'\n"));
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 1);
}

#[test]
fn build_uses_configured_template_directory() {
    let temp = tempfile::tempdir().unwrap();
    let templates = temp.path().join("templates");
    std::fs::create_dir(&templates).unwrap();
    std::fs::write(
        templates.join("plain.py"),
        "__PYSCRIPT_PARAMETERS__\n__PROCESSING_CODE__\n",
    )
    .unwrap();
    let config = AppConfig {
        codegen: CodegenConfig {
            template_dir: Some(templates),
            default_template: "plain".to_string(),
        },
        ..AppConfig::default()
    };
    let notebook = process_notebook(temp.path(), "s_anc");
    let out_dir = temp.path().join("output");

    let status = commands::build(&config, &[notebook], &out_dir, None).unwrap();
    assert_eq!(status, CommandStatus::Success);
    assert_eq!(
        std::fs::read_to_string(out_dir.join("s_anc.py")).unwrap(),
        "__PYSCRIPT_PARAMETERS__\n\
         \n\
         limit = 10\n\
         output_filename = 's_anc'\n\
         \n\
         \n\
         __PROCESSING_CODE__\n\
         \n\
         x = limit\n\
         \n\
         \n"
    );
}

#[test]
fn build_all_clears_stale_output() {
    let temp = tempfile::tempdir().unwrap();
    let src = temp.path().join("nb");
    std::fs::create_dir(&src).unwrap();
    process_notebook(&src, "s_anc");
    let out_dir = temp.path().join("output");
    std::fs::create_dir(&out_dir).unwrap();
    std::fs::write(out_dir.join("stale.py"), "old").unwrap();

    let status =
        commands::build_all(&AppConfig::default(), &src, &out_dir, None, true).unwrap();

    assert_eq!(status, CommandStatus::Success);
    assert!(!out_dir.join("stale.py").exists());
    assert!(out_dir.join("s_anc.py").is_file());
}

#[test]
fn build_all_with_empty_directory_fails() {
    let temp = tempfile::tempdir().unwrap();
    let out_dir = temp.path().join("output");
    let status =
        commands::build_all(&AppConfig::default(), temp.path(), &out_dir, None, false).unwrap();
    assert_eq!(status, CommandStatus::Failure);
    assert!(!out_dir.exists());
}

#[test]
fn convert_exports_every_cell() {
    let temp = tempfile::tempdir().unwrap();
    let notebook = NotebookBuilder::new()
        .untagged("%matplotlib inline\nimport os\n")
        .markdown("# notes")
        .process("x = 1\n")
        .write(temp.path(), "s_anc");
    let out_dir = temp.path().join("toutput");

    let status =
        commands::convert(&[notebook.display().to_string()], &out_dir, false).unwrap();

    assert_eq!(status, CommandStatus::Success);
    assert_eq!(
        std::fs::read_to_string(out_dir.join("s_anc.py")).unwrap(),
        "# %matplotlib inline\nimport os\n\n\nx = 1\n\n"
    );
}

#[test]
fn inspect_reports_consolidated_or_union() {
    let temp = tempfile::tempdir().unwrap();
    let config = AppConfig {
        storage: StoreConfig {
            base_dir: temp.path().to_path_buf(),
            ..StoreConfig::default()
        },
        ..AppConfig::default()
    };
    let store = config.partitioned_store();
    let year = fiscal_year(2024);
    store
        .write_table("s_anc", "10001", year, &hosp_table(&["10001", "10001"], &[1, 2]))
        .unwrap();
    store
        .write_table("s_anc", "20002", year, &hosp_table(&["20002"], &[3]))
        .unwrap();

    let mut out = Vec::new();
    let status = commands::inspect(&config, "s_anc", None, Some("2024"), &mut out).unwrap();
    assert_eq!(status, CommandStatus::Success);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Filename: s_anc\nColumns: HOSPCODE,TOTAL\nRecordtotal: 3\n"
    );

    store
        .write_table("s_anc", ALL_ENTITIES, year, &hosp_table(&["all"], &[6]))
        .unwrap();
    let mut out = Vec::new();
    commands::inspect(&config, "s_anc", None, Some("2024"), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("s_anc__all__2024.parquet"));
    assert!(text.contains("Filesize: "));
    assert!(text.ends_with("Recordtotal: 1\n"));
}

#[test]
fn inspect_missing_partition_fails() {
    let temp = tempfile::tempdir().unwrap();
    let config = AppConfig {
        storage: StoreConfig {
            base_dir: temp.path().to_path_buf(),
            ..StoreConfig::default()
        },
        ..AppConfig::default()
    };

    let mut out = Vec::new();
    let status =
        commands::inspect(&config, "s_anc", Some("10001"), Some("2024"), &mut out).unwrap();
    assert_eq!(status, CommandStatus::Failure);
    let status = commands::inspect(&config, "s_anc", None, Some("2024"), &mut out).unwrap();
    assert_eq!(status, CommandStatus::Failure);
    assert!(out.is_empty());

    // no --year and no configured budget year
    assert!(commands::inspect(&config, "s_anc", None, None, &mut out).is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn run_reports_failed_scripts() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("a_ok.sh"), "exit 0\n").unwrap();
    std::fs::write(temp.path().join("b_bad.sh"), "exit 4\n").unwrap();
    let config = AppConfig {
        runner: RunnerConfig {
            interpreter: "sh".into(),
            workers: 2,
        },
        ..AppConfig::default()
    };

    let status = commands::run(&config, &[pattern(temp.path(), "*.sh")], None)
        .await
        .unwrap();
    assert_eq!(status, CommandStatus::Failure);

    let status = commands::run(&config, &[pattern(temp.path(), "a_*.sh")], Some(1))
        .await
        .unwrap();
    assert_eq!(status, CommandStatus::Success);

    assert!(commands::run(&config, &[pattern(temp.path(), "a_*.sh")], Some(0))
        .await
        .is_err());
}
