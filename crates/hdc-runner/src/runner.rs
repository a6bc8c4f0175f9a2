//! Batch runner
//!
//! With one worker, tasks run strictly in input order. With `N > 1`, `N`
//! workers pull from a shared queue until it drains:
//!
//! ```text
//! tasks → mpsc queue ─┬─ worker 0 ─┐
//!                     ├─ worker 1 ─┼→ outcomes → BatchReport
//!                     └─ worker N ─┘
//! ```
//!
//! A failing task never cancels its siblings, and `run` returns only after
//! every dispatched task has finished.

use crate::error::{RunnerError, RunnerResult};
use crate::executor::TaskExecutor;
use crate::task::{BatchReport, ScriptTask, TaskOutcome, TaskStatus};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};

/// Runs script tasks with bounded concurrency
#[derive(Clone)]
pub struct BatchRunner {
    executor: Arc<dyn TaskExecutor>,
    concurrency: usize,
}

impl std::fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRunner")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl BatchRunner {
    /// Create runner with `concurrency` workers
    ///
    /// # Errors
    /// `RunnerError::InvalidConcurrency` when `concurrency` is zero.
    pub fn new(executor: Arc<dyn TaskExecutor>, concurrency: usize) -> RunnerResult<Self> {
        if concurrency == 0 {
            return Err(RunnerError::InvalidConcurrency(concurrency));
        }
        Ok(Self {
            executor,
            concurrency,
        })
    }

    /// Worker count
    #[inline]
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every task and aggregate the outcomes
    ///
    /// # Errors
    /// `RunnerError::WorkerAborted` when a worker panicked; this is reported
    /// only after all other workers have finished.
    pub async fn run(&self, tasks: Vec<ScriptTask>) -> RunnerResult<BatchReport> {
        let started = Instant::now();
        let total = tasks.len();
        tracing::info!(tasks = total, workers = self.concurrency, "batch started");

        let outcomes = if self.concurrency == 1 {
            self.run_sequential(tasks).await
        } else {
            self.run_pooled(tasks).await?
        };

        let report = BatchReport {
            outcomes,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            tasks = total,
            succeeded = report.succeeded(),
            failed = report.failed(),
            elapsed = ?report.elapsed,
            "batch finished"
        );
        Ok(report)
    }

    async fn run_sequential(&self, tasks: Vec<ScriptTask>) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::with_capacity(tasks.len());
        for task in tasks {
            outcomes.push(run_task(self.executor.as_ref(), task).await);
        }
        outcomes
    }

    async fn run_pooled(&self, tasks: Vec<ScriptTask>) -> RunnerResult<Vec<TaskOutcome>> {
        let total = tasks.len();
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        for task in tasks {
            queue_tx.send(task).map_err(|_| RunnerError::QueueClosed)?;
        }
        drop(queue_tx);

        let queue = Arc::new(Mutex::new(queue_rx));
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();

        let workers = self.concurrency.min(total);
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let executor = Arc::clone(&self.executor);
            let outcome_tx = outcome_tx.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let next = queue.lock().await.recv().await;
                    let Some(task) = next else { break };
                    let outcome = run_task(executor.as_ref(), task).await;
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
                tracing::trace!(worker, "worker drained");
            }));
        }
        drop(outcome_tx);

        let mut aborted = None;
        for (worker, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                tracing::error!(worker, error = %e, "worker aborted");
                aborted.get_or_insert(RunnerError::WorkerAborted {
                    worker,
                    reason: e.to_string(),
                });
            }
        }
        if let Some(err) = aborted {
            return Err(err);
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = outcome_rx.recv().await {
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

async fn run_task(executor: &dyn TaskExecutor, task: ScriptTask) -> TaskOutcome {
    tracing::info!(script = %task, "starting");
    let started = Instant::now();
    let status = executor.execute(&task).await;
    let duration = started.elapsed();

    match &status {
        TaskStatus::Succeeded => tracing::info!(script = %task, ?duration, "done"),
        TaskStatus::Failed { exit_code } => {
            tracing::warn!(script = %task, ?exit_code, ?duration, "failed");
        }
        TaskStatus::SpawnFailed(reason) => {
            tracing::error!(script = %task, %reason, "could not start");
        }
    }

    TaskOutcome {
        task,
        status,
        duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Fails every task whose file stem starts with `fail`
    struct StemExecutor {
        seen: std::sync::Mutex<Vec<String>>,
    }

    impl StemExecutor {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl TaskExecutor for StemExecutor {
        async fn execute(&self, task: &ScriptTask) -> TaskStatus {
            self.seen.lock().unwrap().push(task.to_string());
            tokio::task::yield_now().await;
            if task.to_string().starts_with("fail") {
                TaskStatus::Failed { exit_code: Some(1) }
            } else {
                TaskStatus::Succeeded
            }
        }
    }

    fn tasks(names: &[&str]) -> Vec<ScriptTask> {
        names.iter().map(ScriptTask::new).collect()
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = BatchRunner::new(StemExecutor::new(), 0).unwrap_err();
        assert!(matches!(err, RunnerError::InvalidConcurrency(0)));
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_siblings() {
        let executor = StemExecutor::new();
        let runner = BatchRunner::new(executor.clone(), 2).unwrap();

        let report = runner.run(tasks(&["fail_a.py", "b.py"])).await.unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert_eq!(executor.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn single_worker_keeps_input_order() {
        let executor = StemExecutor::new();
        let runner = BatchRunner::new(executor.clone(), 1).unwrap();

        let report = runner
            .run(tasks(&["c.py", "fail_a.py", "b.py"]))
            .await
            .unwrap();

        let order: Vec<_> = report.outcomes.iter().map(|o| o.task.to_string()).collect();
        assert_eq!(order, ["c.py", "fail_a.py", "b.py"]);
        assert_eq!(*executor.seen.lock().unwrap(), ["c.py", "fail_a.py", "b.py"]);
    }

    #[tokio::test]
    async fn empty_batch_succeeds() {
        let runner = BatchRunner::new(StemExecutor::new(), 4).unwrap();
        let report = runner.run(Vec::new()).await.unwrap();
        assert!(report.outcomes.is_empty());
        assert!(report.is_success());
    }

    /// Blocks until `parties` tasks are in flight at once
    struct RendezvousExecutor {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait::async_trait]
    impl TaskExecutor for RendezvousExecutor {
        async fn execute(&self, _task: &ScriptTask) -> TaskStatus {
            self.barrier.wait().await;
            TaskStatus::Succeeded
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn workers_run_concurrently() {
        let executor = Arc::new(RendezvousExecutor {
            barrier: tokio::sync::Barrier::new(3),
        });
        let runner = BatchRunner::new(executor, 3).unwrap();

        let report = tokio::time::timeout(
            Duration::from_secs(10),
            runner.run(tasks(&["a.py", "b.py", "c.py"])),
        )
        .await
        .expect("tasks never overlapped")
        .unwrap();
        assert_eq!(report.succeeded(), 3);
    }

    struct PanickingExecutor;

    #[async_trait::async_trait]
    impl TaskExecutor for PanickingExecutor {
        async fn execute(&self, task: &ScriptTask) -> TaskStatus {
            if task.to_string() == "boom.py" {
                panic!("executor bug");
            }
            TaskStatus::Succeeded
        }
    }

    #[tokio::test]
    async fn worker_panic_is_reported_after_siblings_finish() {
        let runner = BatchRunner::new(Arc::new(PanickingExecutor), 2).unwrap();
        let err = runner.run(tasks(&["boom.py", "ok.py"])).await.unwrap_err();
        assert!(matches!(err, RunnerError::WorkerAborted { .. }));
    }
}
