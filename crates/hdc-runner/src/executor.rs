//! Task execution
//!
//! The runner never starts processes itself; it hands each task to a
//! [`TaskExecutor`]. [`ProcessExecutor`] is the production implementation.

use crate::task::{ScriptTask, TaskStatus};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Interpreter used when none is configured
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Executes a single task to completion
///
/// Implementations report every failure through [`TaskStatus`]; they never
/// abort the batch.
#[async_trait::async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run `task` and report how it ended
    async fn execute(&self, task: &ScriptTask) -> TaskStatus;
}

/// Runs `<interpreter> <script>` as a child process
///
/// The child inherits stdout and stderr; extra environment variables are
/// added on top of the parent's environment.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    interpreter: PathBuf,
    envs: Vec<(OsString, OsString)>,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_INTERPRETER)
    }
}

impl ProcessExecutor {
    /// Create executor for an interpreter
    #[must_use]
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            envs: Vec::new(),
        }
    }

    /// Add an environment variable for every child
    #[must_use]
    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Interpreter path
    #[inline]
    #[must_use]
    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }
}

#[async_trait::async_trait]
impl TaskExecutor for ProcessExecutor {
    async fn execute(&self, task: &ScriptTask) -> TaskStatus {
        tracing::debug!(
            interpreter = %self.interpreter.display(),
            script = %task,
            "spawning"
        );

        let status = Command::new(&self.interpreter)
            .arg(task.path())
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(status) if status.success() => TaskStatus::Succeeded,
            Ok(status) => TaskStatus::Failed {
                exit_code: status.code(),
            },
            Err(e) => TaskStatus::SpawnFailed(e.to_string()),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn script(dir: &Path, name: &str, body: &str) -> ScriptTask {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        ScriptTask::new(path)
    }

    #[tokio::test]
    async fn exit_codes_map_to_status() {
        let temp = tempfile::tempdir().unwrap();
        let executor = ProcessExecutor::new("sh");

        let ok = script(temp.path(), "ok.sh", "exit 0\n");
        let bad = script(temp.path(), "bad.sh", "exit 3\n");

        assert_eq!(executor.execute(&ok).await, TaskStatus::Succeeded);
        assert_eq!(
            executor.execute(&bad).await,
            TaskStatus::Failed { exit_code: Some(3) }
        );
    }

    #[tokio::test]
    async fn environment_reaches_child() {
        let temp = tempfile::tempdir().unwrap();
        let executor = ProcessExecutor::new("sh").with_env("HDC_EXPECTED", "2024");
        let task = script(
            temp.path(),
            "env.sh",
            "[ \"$HDC_EXPECTED\" = \"2024\" ] || exit 7\n",
        );

        assert_eq!(executor.execute(&task).await, TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn missing_interpreter_is_spawn_failure() {
        let executor = ProcessExecutor::new("/nonexistent/interpreter");
        let status = executor.execute(&ScriptTask::new("x.py")).await;
        assert!(matches!(status, TaskStatus::SpawnFailed(_)));
    }
}
