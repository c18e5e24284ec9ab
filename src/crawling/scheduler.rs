//! Bounded task scheduler
//!
//! Every task is spawned onto a `JoinSet` and waits for one of `workers`
//! semaphore permits before it runs. Outcomes are collected in completion
//! order. A panicking execution is converted into a failure outcome for that
//! task alone, and a task that vanishes without an outcome is recorded as a
//! failure too, so the outcome count always equals the task count.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::domain::outcome::TaskOutcome;
use crate::domain::task::{Task, TaskId};

/// Performs one task end to end
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &Task) -> TaskOutcome;
}

#[derive(Debug, Clone, Copy)]
pub struct TaskScheduler {
    workers: usize,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

impl TaskScheduler {
    /// Scheduler with `workers` concurrent slots (at least one)
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Run every task and return one outcome per task
    pub async fn run(&self, tasks: Vec<Task>, executor: Arc<dyn TaskExecutor>) -> Vec<TaskOutcome> {
        let total = tasks.len();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut pending: HashMap<TaskId, Task> = HashMap::with_capacity(total);
        let mut join_set = JoinSet::new();

        info!(
            "🚀 Scheduling {} tasks with semaphore control (max: {})",
            total, self.workers
        );

        for task in tasks {
            pending.insert(task.id, task.clone());
            let semaphore = Arc::clone(&semaphore);
            let executor = Arc::clone(&executor);

            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return TaskOutcome::aborted(task, "worker pool closed before the task started");
                };
                debug!("🔓 Acquired permit for {}", task);

                let result = AssertUnwindSafe(executor.execute(&task)).catch_unwind().await;
                match result {
                    Ok(outcome) => outcome,
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!("💥 Task {} panicked: {}", task, message);
                        TaskOutcome::aborted(task, format!("task panicked: {message}"))
                    }
                }
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => {
                    pending.remove(&outcome.task.id);
                    if outcome.has_failure() {
                        warn!("[{}/{}] {} finished with failures", outcomes.len() + 1, total, outcome.task);
                    } else {
                        info!("✅ [{}/{}] {} completed", outcomes.len() + 1, total, outcome.task);
                    }
                    outcomes.push(outcome);
                }
                Err(e) => error!("❌ Task join error: {}", e),
            }
        }

        for (_, task) in pending.drain() {
            error!("Task {} ended without an outcome", task);
            outcomes.push(TaskOutcome::aborted(task, "task ended without an outcome"));
        }

        outcomes
    }
}
