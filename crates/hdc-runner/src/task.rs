//! Tasks and their outcomes

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A script to execute
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptTask {
    path: PathBuf,
}

impl ScriptTask {
    /// Create task for a script path
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Script path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ScriptTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// How a task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Exit code zero
    Succeeded,
    /// Non-zero exit; `None` when terminated by a signal
    Failed {
        /// Process exit code
        exit_code: Option<i32>,
    },
    /// The process could not be started
    SpawnFailed(String),
}

impl TaskStatus {
    /// Whether the task succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("done"),
            Self::Failed {
                exit_code: Some(code),
            } => write!(f, "failed[{code}]"),
            Self::Failed { exit_code: None } => f.write_str("failed[signal]"),
            Self::SpawnFailed(reason) => write!(f, "spawn failed: {reason}"),
        }
    }
}

/// Result of one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    /// The task
    pub task: ScriptTask,
    /// How it ended
    pub status: TaskStatus,
    /// Wall-clock run time
    pub duration: Duration,
}

impl TaskOutcome {
    /// Whether the task succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Aggregate result of a batch
///
/// Outcomes are in input order for sequential runs and in completion order
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Per-task outcomes
    pub outcomes: Vec<TaskOutcome>,
    /// Wall-clock time of the whole batch
    pub elapsed: Duration,
}

impl BatchReport {
    /// Number of successful tasks
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of failed tasks
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Outcomes of failed tasks
    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Whether every task succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}
