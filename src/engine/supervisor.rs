// ABOUTME: Per-task retry and timeout supervision with capped exponential backoff
// ABOUTME: An explicit bounded loop carries (attempt, backoff) state; the retry path never recurses

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, warn};

use super::context::TaskContext;
use super::error::ExecutionError;
use super::execution::TaskRunRecord;
use super::task::{Task, TaskStatus};
use crate::tasks::TaskExecutor;

/// What the supervisor needs to know about one task, detached from the
/// workflow so attempts can be spawned onto the runtime.
#[derive(Debug, Clone)]
pub struct AttemptSpec {
    pub task_id: String,
    pub timeout: Option<Duration>,
    pub max_retries: u32,
}

impl AttemptSpec {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            timeout: task.timeout,
            max_retries: task.max_retries,
        }
    }
}

/// Supervises a single task invocation: timeout enforcement plus bounded
/// retry with exponential backoff, capped so large retry budgets cannot
/// produce multi-day waits.
#[derive(Debug, Clone)]
pub struct TaskSupervisor {
    default_timeout: Duration,
    backoff_base: Duration,
    backoff_cap: Duration,
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(3600),
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(60),
        }
    }
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    /// Run one task to a terminal outcome. Every failure, timeouts included,
    /// consumes a retry while the budget lasts; the returned record carries
    /// the final retry count, so a task succeeding on attempt k reports k-1.
    pub async fn run_task(
        &self,
        spec: AttemptSpec,
        executor: Arc<dyn TaskExecutor>,
        ctx: TaskContext,
    ) -> TaskRunRecord {
        let started_at = Utc::now();
        let clock = Instant::now();
        let time_limit = spec.timeout.unwrap_or(self.default_timeout);
        let mut retry_count: u32 = 0;

        loop {
            debug!(
                task = %spec.task_id,
                attempt = retry_count + 1,
                limit = ?time_limit,
                "starting task attempt"
            );

            let failure = match timeout(time_limit, executor.execute(ctx.clone())).await {
                Ok(Ok(value)) => {
                    return TaskRunRecord {
                        task_id: spec.task_id,
                        status: TaskStatus::Completed,
                        result: Some(value),
                        error: None,
                        retry_count,
                        started_at,
                        finished_at: Utc::now(),
                        duration: clock.elapsed(),
                    };
                }
                Ok(Err(err)) => ExecutionError::TaskFailed {
                    task_id: spec.task_id.clone(),
                    message: format!("{err:#}"),
                }
                .to_string(),
                Err(_) => ExecutionError::TaskTimeout {
                    task_id: spec.task_id.clone(),
                    timeout: time_limit,
                }
                .to_string(),
            };

            if retry_count < spec.max_retries {
                retry_count += 1;
                let delay = self.backoff_delay(retry_count);
                warn!(
                    task = %spec.task_id,
                    retry = retry_count,
                    max_retries = spec.max_retries,
                    delay = ?delay,
                    error = %failure,
                    "task attempt failed, backing off before retry"
                );
                sleep(delay).await;
            } else {
                error!(
                    task = %spec.task_id,
                    retries = retry_count,
                    error = %failure,
                    "task failed terminally"
                );
                return TaskRunRecord {
                    task_id: spec.task_id,
                    status: TaskStatus::Failed,
                    result: None,
                    error: Some(failure),
                    retry_count,
                    started_at,
                    finished_at: Utc::now(),
                    duration: clock.elapsed(),
                };
            }
        }
    }

    /// Delay before the given retry: `base * 2^retry_count`, clamped to the cap.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let factor = 1u32.checked_shl(retry_count.min(31)).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor).min(self.backoff_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::RunScope;
    use crate::engine::Workflow;
    use crate::tasks::FnExecutor;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn harness(task: Task) -> (AttemptSpec, Arc<dyn TaskExecutor>, TaskContext) {
        let spec = AttemptSpec::from_task(&task);
        let executor = task.executor();
        let mut workflow = Workflow::new("supervisor_test");
        workflow.add_task(task).unwrap();
        let scope = RunScope::new(&workflow, "run-1");
        let ctx = scope.context_for(workflow.tasks().next().unwrap());
        (spec, executor, ctx)
    }

    fn fast_supervisor() -> TaskSupervisor {
        TaskSupervisor::new().with_backoff(Duration::from_millis(1), Duration::from_millis(8))
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_has_zero_retries() {
        let task = Task::new(
            "ok",
            FnExecutor::arc(|_ctx| async { Ok(json!("done")) }),
        );
        let (spec, executor, ctx) = harness(task);

        let record = fast_supervisor().run_task(spec, executor, ctx).await;
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.retry_count, 0);
        assert_eq!(record.result, Some(json!("done")));
    }

    #[tokio::test]
    async fn test_success_on_third_attempt_reports_two_retries() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let task = Task::new(
            "flaky",
            FnExecutor::arc(move |_ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        anyhow::bail!("transient failure");
                    }
                    Ok(Value::Null)
                }
            }),
        )
        .with_max_retries(5);
        let (spec, executor, ctx) = harness(task);

        let record = fast_supervisor().run_task(spec, executor, ctx).await;
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.retry_count, 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_terminally() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let task = Task::new(
            "broken",
            FnExecutor::arc(move |_ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    anyhow::bail!("always fails")
                }
            }),
        )
        .with_max_retries(2);
        let (spec, executor, ctx) = harness(task);

        let record = fast_supervisor().run_task(spec, executor, ctx).await;
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.retry_count, 2);
        // initial attempt plus two retries
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(record.error.unwrap().contains("always fails"));
    }

    #[tokio::test]
    async fn test_timeout_is_mapped_and_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let task = Task::new(
            "slow_then_fast",
            FnExecutor::arc(move |_ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        sleep(Duration::from_millis(200)).await;
                    }
                    Ok(Value::Null)
                }
            }),
        )
        .with_timeout(Duration::from_millis(30))
        .with_max_retries(1);
        let (spec, executor, ctx) = harness(task);

        let record = fast_supervisor().run_task(spec, executor, ctx).await;
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.retry_count, 1);
    }

    #[tokio::test]
    async fn test_timeout_without_retry_budget_fails() {
        let task = Task::new(
            "hung",
            FnExecutor::arc(|_ctx| async {
                sleep(Duration::from_secs(5)).await;
                Ok(Value::Null)
            }),
        )
        .with_timeout(Duration::from_millis(20));
        let (spec, executor, ctx) = harness(task);

        let record = fast_supervisor().run_task(spec, executor, ctx).await;
        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record.error.unwrap().contains("timed out"));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let supervisor = TaskSupervisor::new()
            .with_backoff(Duration::from_secs(1), Duration::from_secs(60));

        assert_eq!(supervisor.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(supervisor.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(supervisor.backoff_delay(5), Duration::from_secs(32));
        // 2^10 seconds would be ~17 minutes; the cap holds it at one minute
        assert_eq!(supervisor.backoff_delay(10), Duration::from_secs(60));
        assert_eq!(supervisor.backoff_delay(31), Duration::from_secs(60));
    }
}
