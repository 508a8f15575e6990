// ABOUTME: Bounded concurrent strategy with priority-ordered admission
// ABOUTME: Suspends on join_next completion notifications, never on a polling sleep

use std::cmp::Reverse;
use std::collections::HashSet;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::error::Result;
use super::execution::{Execution, TaskRunRecord};
use super::runtime::{self, EngineShared};
use super::task::TaskStatus;
use super::workflow::Workflow;

/// Run dependency-satisfied tasks concurrently, bounded by
/// `max_parallel_tasks`. The ready queue is ordered by priority descending
/// with declared order breaking ties. Returns true when the run aborted.
pub(crate) async fn run(
    workflow: &mut Workflow,
    execution: &mut Execution,
    shared: &EngineShared<'_>,
) -> Result<bool> {
    let limit = workflow.max_parallel_tasks.max(1);
    info!(limit, tasks = workflow.len(), "running workflow concurrently");

    let mut join_set: JoinSet<TaskRunRecord> = JoinSet::new();
    let mut ready: Vec<String> = Vec::new();
    let mut queued: HashSet<String> = HashSet::new();
    let mut running: HashSet<String> = HashSet::new();

    refill_ready(workflow, &mut ready, &mut queued);

    loop {
        while running.len() < limit && !ready.is_empty() {
            let task_id = ready.remove(0);
            let (spec, executor, ctx) =
                runtime::admit(workflow, execution, shared, &task_id).await;
            let supervisor = shared.supervisor.clone();
            debug!(task = %task_id, in_flight = running.len() + 1, "admitting task");
            running.insert(task_id);
            join_set.spawn(async move { supervisor.run_task(spec, executor, ctx).await });
        }

        if running.is_empty() {
            break;
        }

        // Suspend until whichever in-flight task finishes first
        match join_set.join_next().await {
            Some(Ok(record)) => {
                running.remove(&record.task_id);
                let abort = runtime::apply_outcome(workflow, execution, shared, record).await;
                if abort {
                    cancel_in_flight(workflow, execution, shared, &mut join_set, &mut running)
                        .await?;
                    return Ok(true);
                }
                refill_ready(workflow, &mut ready, &mut queued);
            }
            Some(Err(join_err)) if join_err.is_cancelled() => continue,
            Some(Err(join_err)) => return Err(join_err.into()),
            None => break,
        }
    }

    Ok(false)
}

/// Abort every in-flight task cooperatively and record the casualties.
/// Attempts that finish between the abort decision and its delivery are
/// applied as ordinary outcomes.
async fn cancel_in_flight(
    workflow: &mut Workflow,
    execution: &mut Execution,
    shared: &EngineShared<'_>,
    join_set: &mut JoinSet<TaskRunRecord>,
    running: &mut HashSet<String>,
) -> Result<()> {
    warn!(in_flight = running.len(), "cancelling in-flight tasks");
    join_set.abort_all();

    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(record) => {
                running.remove(&record.task_id);
                runtime::apply_outcome(workflow, execution, shared, record).await;
            }
            Err(join_err) if join_err.is_cancelled() => {}
            Err(join_err) => return Err(join_err.into()),
        }
    }

    for task_id in running.drain() {
        runtime::mark_cancelled(workflow, execution, shared, &task_id).await;
    }
    Ok(())
}

/// Append newly ready tasks in declared order, then re-sort the queue by
/// priority descending. The sort is stable, so equal priorities keep their
/// insertion order.
fn refill_ready(workflow: &Workflow, ready: &mut Vec<String>, queued: &mut HashSet<String>) {
    for task in workflow.tasks() {
        if task.status == TaskStatus::Pending
            && !queued.contains(&task.id)
            && runtime::dependencies_completed(workflow, &task.id)
        {
            queued.insert(task.id.clone());
            ready.push(task.id.clone());
        }
    }
    ready.sort_by_key(|id| {
        Reverse(
            workflow
                .task(id)
                .map(|t| t.priority)
                .unwrap_or_default(),
        )
    });
}
