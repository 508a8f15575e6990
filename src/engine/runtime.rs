// ABOUTME: Shared machinery for the execution strategies: admission, outcome application, policy
// ABOUTME: All workflow and execution mutation funnels through here, keeping the run single-writer

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::context::{RunScope, TaskContext};
use super::error::ExecutionError;
use super::execution::{Execution, TaskRunRecord};
use super::policy::FailureAction;
use super::supervisor::{AttemptSpec, TaskSupervisor};
use super::task::TaskStatus;
use super::workflow::Workflow;
use crate::resources::{ReservationManager, ReservationRequest};
use crate::tasks::TaskExecutor;

/// Run-scoped collaborators handed to every strategy.
pub(crate) struct EngineShared<'a> {
    pub supervisor: &'a TaskSupervisor,
    pub reservations: &'a ReservationManager,
    pub scope: &'a RunScope,
}

/// True when every dependency of the task has completed.
pub(crate) fn dependencies_completed(workflow: &Workflow, task_id: &str) -> bool {
    match workflow.task(task_id) {
        Some(task) => task.dependencies.iter().all(|dep| {
            workflow
                .task(dep)
                .map(|d| d.status == TaskStatus::Completed)
                .unwrap_or(false)
        }),
        None => false,
    }
}

/// Admit a task: mark it running, claim its resources, and hand back what a
/// strategy needs to drive the supervised attempt.
pub(crate) async fn admit(
    workflow: &mut Workflow,
    execution: &mut Execution,
    shared: &EngineShared<'_>,
    task_id: &str,
) -> (AttemptSpec, Arc<dyn TaskExecutor>, TaskContext) {
    {
        let task = workflow
            .task_mut(task_id)
            .expect("admitted task exists in the workflow");
        task.mark_running();
    }
    execution.task_started(task_id);

    let task = workflow.task(task_id).expect("task exists");
    for request in &task.resources {
        let reservation = shared
            .reservations
            .reserve(ReservationRequest {
                task_id: task.id.clone(),
                kind: request.kind.clone(),
                resource_id: request.id.clone(),
                starts_at: None,
                duration: request.duration.or(task.estimated_duration),
                exclusive: request.exclusive,
                priority: task.priority.reservation_weight(),
            })
            .await;
        debug!(
            task = %task.id,
            resource = %reservation.resource_id,
            from = %reservation.reserved_at,
            until = %reservation.expires_at,
            "claimed resource"
        );
    }

    (
        AttemptSpec::from_task(task),
        task.executor(),
        shared.scope.context_for(task),
    )
}

/// Apply a supervised outcome to the workflow and execution, release the
/// task's reservations, and consult the failure policy. Returns true when
/// the run must abort.
pub(crate) async fn apply_outcome(
    workflow: &mut Workflow,
    execution: &mut Execution,
    shared: &EngineShared<'_>,
    record: TaskRunRecord,
) -> bool {
    let task_id = record.task_id.clone();
    let priority = {
        let task = workflow
            .task_mut(&task_id)
            .expect("finished task exists in the workflow");
        task.status = record.status;
        task.retry_count = record.retry_count;
        task.result = record.result.clone();
        task.error = record.error.clone();
        task.started_at = Some(record.started_at);
        task.completed_at = Some(record.finished_at);
        task.actual_duration = Some(record.duration);
        task.priority
    };

    if record.succeeded() {
        if let Some(value) = &record.result {
            shared.scope.record_output(&task_id, value.clone()).await;
        }
        info!(task = %task_id, duration = ?record.duration, "task completed");
    }

    shared.reservations.release_task(&task_id).await;

    let failed = !record.succeeded();
    let failure_text = record.error.clone().unwrap_or_else(|| "unknown error".to_string());
    execution.apply_record(record);

    if !failed {
        return false;
    }

    match workflow.failure_strategy.on_failure(priority) {
        FailureAction::Abort => {
            let reason = format!("critical task '{}' failed: {}", task_id, failure_text);
            error!(task = %task_id, %reason, "aborting workflow run");
            execution.add_error(ExecutionError::WorkflowAborted { reason }.to_string());
            true
        }
        FailureAction::Record => {
            execution.add_warning(format!("task '{}' failed: {}", task_id, failure_text));
            false
        }
    }
}

/// Record a cooperatively cancelled task as failed. The run has already
/// aborted, so the failure policy is not consulted again.
pub(crate) async fn mark_cancelled(
    workflow: &mut Workflow,
    execution: &mut Execution,
    shared: &EngineShared<'_>,
    task_id: &str,
) {
    let now = Utc::now();
    let (started_at, retry_count) = workflow
        .task(task_id)
        .map(|t| (t.started_at.unwrap_or(now), t.retry_count))
        .unwrap_or((now, 0));

    let record = TaskRunRecord {
        task_id: task_id.to_string(),
        status: TaskStatus::Failed,
        result: None,
        error: Some("cancelled: workflow aborted".to_string()),
        retry_count,
        started_at,
        finished_at: now,
        duration: (now - started_at).to_std().unwrap_or_default(),
    };

    if let Some(task) = workflow.task_mut(task_id) {
        task.status = TaskStatus::Failed;
        task.error = record.error.clone();
        task.completed_at = Some(now);
    }
    shared.reservations.release_task(task_id).await;
    execution.apply_record(record);
}
