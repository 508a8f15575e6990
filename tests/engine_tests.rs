// ABOUTME: Integration tests for the workflow execution engine
// ABOUTME: Covers strategy behavior, failure policy, retries, timeouts, and queries

use std::sync::{Arc, Mutex};
use std::time::Duration;

use conductor::engine::{
    ExecutionMode, ExecutionStatus, FailureStrategy, TaskPriority, TaskStatus, Workflow,
    WorkflowEngine,
};

mod common;
use common::{
    failing_task, fast_engine, flaky_task, ok_task, recording_task, sleeping_task,
    ConcurrencyProbe,
};

#[tokio::test]
async fn test_sequential_run_respects_topological_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut workflow = Workflow::new("sequential_order").with_mode(ExecutionMode::Sequential);
    workflow.add_task(recording_task("fetch", &log)).unwrap();
    workflow.add_task(recording_task("build", &log)).unwrap();
    workflow.add_task(recording_task("test", &log)).unwrap();
    workflow.add_dependency("build", "fetch").unwrap();
    workflow.add_dependency("test", "build").unwrap();

    let mut engine = WorkflowEngine::new();
    let execution = engine.execute_workflow(&mut workflow).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(*log.lock().unwrap(), vec!["fetch", "build", "test"]);
}

#[tokio::test]
async fn test_leveled_run_executes_level_zero_alone() {
    // A with no deps, B and C depending on A: level grouping [[A], [B, C]]
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut workflow = Workflow::new("leveled_abc");
    workflow.add_task(recording_task("a", &log)).unwrap();
    workflow.add_task(recording_task("b", &log)).unwrap();
    workflow.add_task(recording_task("c", &log)).unwrap();
    workflow.add_dependency("b", "a").unwrap();
    workflow.add_dependency("c", "a").unwrap();

    let mut engine = WorkflowEngine::new();
    let execution = engine.execute_workflow(&mut workflow).await.unwrap();

    // No declared mode: the fallback heuristic picks leveled for a dependency graph
    assert_eq!(execution.mode, ExecutionMode::Leveled);
    assert_eq!(execution.status, ExecutionStatus::Completed);

    let order = log.lock().unwrap().clone();
    assert_eq!(order[0], "a");
    let mut tail = order[1..].to_vec();
    tail.sort();
    assert_eq!(tail, vec!["b", "c"]);
}

#[tokio::test]
async fn test_critical_failure_aborts_and_later_tasks_never_start() {
    let mut workflow = Workflow::new("critical_abort");
    workflow.add_task(ok_task("setup")).unwrap();
    workflow
        .add_task(failing_task("deploy").with_priority(TaskPriority::Critical))
        .unwrap();
    workflow.add_task(ok_task("announce")).unwrap();
    workflow.add_dependency("deploy", "setup").unwrap();
    workflow.add_dependency("announce", "deploy").unwrap();

    let mut engine = WorkflowEngine::new();
    let execution = engine.execute_workflow(&mut workflow).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.failed_tasks.contains(&"deploy".to_string()));
    assert!(!execution.errors.is_empty());
    assert!(execution.errors[0].contains("aborted"));

    // Nothing past the failed critical task was ever started
    assert!(execution.record("announce").is_none());
    assert_eq!(
        workflow.task("announce").unwrap().status,
        TaskStatus::Pending
    );
}

#[tokio::test]
async fn test_non_critical_failure_becomes_warning_and_run_continues() {
    let mut workflow = Workflow::new("warning_continue").with_mode(ExecutionMode::Sequential);
    workflow.add_task(failing_task("optional_step")).unwrap();
    workflow.add_task(ok_task("main_step")).unwrap();

    let mut engine = WorkflowEngine::new();
    let execution = engine.execute_workflow(&mut workflow).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::PartialSuccess);
    assert!(execution.errors.is_empty());
    assert_eq!(execution.warnings.len(), 1);
    assert!(execution.warnings[0].contains("optional_step"));
    assert!(execution.completed_tasks.contains(&"main_step".to_string()));
}

#[tokio::test]
async fn test_continue_strategy_survives_critical_failures() {
    let mut workflow = Workflow::new("continue_strategy")
        .with_mode(ExecutionMode::Sequential)
        .with_failure_strategy(FailureStrategy::Continue);
    workflow
        .add_task(failing_task("important").with_priority(TaskPriority::Urgent))
        .unwrap();
    workflow.add_task(ok_task("cleanup")).unwrap();

    let mut engine = WorkflowEngine::new();
    let execution = engine.execute_workflow(&mut workflow).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::PartialSuccess);
    assert!(execution.errors.is_empty());
    assert!(execution.completed_tasks.contains(&"cleanup".to_string()));
}

#[tokio::test]
async fn test_concurrent_run_never_exceeds_the_parallel_limit() {
    let probe = ConcurrencyProbe::new();
    let mut workflow = Workflow::new("bounded_concurrency").with_max_parallel_tasks(2);
    for i in 0..5 {
        workflow
            .add_task(probe.task(&format!("task_{}", i), Duration::from_millis(30)))
            .unwrap();
    }

    let mut engine = WorkflowEngine::new();
    let execution = engine.execute_workflow(&mut workflow).await.unwrap();

    // Independent tasks select the concurrent strategy
    assert_eq!(execution.mode, ExecutionMode::Concurrent);
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.completed_count(), 5);
    assert!(probe.peak() <= 2, "peak concurrency was {}", probe.peak());
}

#[tokio::test]
async fn test_concurrent_admission_is_priority_ordered() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut workflow = Workflow::new("priority_admission")
        .with_mode(ExecutionMode::Concurrent)
        .with_max_parallel_tasks(1);
    workflow
        .add_task(recording_task("background", &log).with_priority(TaskPriority::Low))
        .unwrap();
    workflow
        .add_task(recording_task("hotfix", &log).with_priority(TaskPriority::Urgent))
        .unwrap();
    workflow.add_task(recording_task("routine", &log)).unwrap();

    let mut engine = WorkflowEngine::new();
    engine.execute_workflow(&mut workflow).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["hotfix", "routine", "background"]);
}

#[tokio::test]
async fn test_concurrent_critical_failure_cancels_in_flight_tasks() {
    let mut workflow = Workflow::new("cancel_in_flight")
        .with_mode(ExecutionMode::Concurrent)
        .with_max_parallel_tasks(2);
    workflow
        .add_task(failing_task("guard").with_priority(TaskPriority::Critical))
        .unwrap();
    workflow
        .add_task(sleeping_task("long_haul", Duration::from_secs(30)))
        .unwrap();

    let mut engine = WorkflowEngine::new();
    let execution = engine.execute_workflow(&mut workflow).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.failed_tasks.contains(&"guard".to_string()));
    assert!(execution.failed_tasks.contains(&"long_haul".to_string()));

    let cancelled = execution.record("long_haul").unwrap();
    assert_eq!(cancelled.status, TaskStatus::Failed);
    assert!(cancelled.error.as_ref().unwrap().contains("cancelled"));
}

#[tokio::test]
async fn test_retry_succeeds_and_reports_retry_count() {
    let mut workflow = Workflow::new("retry_success").with_mode(ExecutionMode::Sequential);
    workflow
        .add_task(flaky_task("flaky", 2).with_max_retries(5))
        .unwrap();

    let mut engine = fast_engine();
    let execution = engine.execute_workflow(&mut workflow).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    let record = execution.record("flaky").unwrap();
    assert_eq!(record.status, TaskStatus::Completed);
    // Success on the third attempt means two retries
    assert_eq!(record.retry_count, 2);
    assert_eq!(workflow.task("flaky").unwrap().retry_count, 2);
}

#[tokio::test]
async fn test_timeout_fails_the_task() {
    let mut workflow = Workflow::new("timeout").with_mode(ExecutionMode::Sequential);
    workflow
        .add_task(
            sleeping_task("hung", Duration::from_secs(30))
                .with_timeout(Duration::from_millis(20)),
        )
        .unwrap();

    let mut engine = fast_engine();
    let execution = engine.execute_workflow(&mut workflow).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    let record = execution.record("hung").unwrap();
    assert!(record.error.as_ref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_dependent_of_failed_task_is_never_started() {
    let mut workflow = Workflow::new("dep_failed")
        .with_mode(ExecutionMode::Sequential)
        .with_failure_strategy(FailureStrategy::Continue);
    workflow.add_task(failing_task("base")).unwrap();
    workflow.add_task(ok_task("dependent")).unwrap();
    workflow.add_dependency("dependent", "base").unwrap();

    let mut engine = WorkflowEngine::new();
    let execution = engine.execute_workflow(&mut workflow).await.unwrap();

    assert_eq!(
        workflow.task("dependent").unwrap().status,
        TaskStatus::Pending
    );
    assert!(execution
        .warnings
        .iter()
        .any(|w| w.contains("dependent") && w.contains("never started")));
}

#[tokio::test]
async fn test_status_and_metrics_queries_after_runs() {
    let mut engine = WorkflowEngine::new();

    let mut success = Workflow::new("query_success");
    success.add_task(ok_task("a")).unwrap();
    success.add_task(ok_task("b")).unwrap();
    let success_id = engine.register_workflow(success);

    let mut failure = Workflow::new("query_failure");
    failure
        .add_task(failing_task("x").with_priority(TaskPriority::Critical))
        .unwrap();
    let failure_id = engine.register_workflow(failure);

    engine.execute(&success_id).await.unwrap();
    engine.execute(&failure_id).await.unwrap();

    let status = engine.workflow_status(&success_id).unwrap();
    assert_eq!(status.task_count, 2);
    let latest = status.latest_execution.unwrap();
    assert_eq!(latest.status, ExecutionStatus::Completed);
    assert_eq!(latest.completed_count, 2);

    let metrics = engine.metrics().await;
    assert_eq!(metrics.total_workflows, 2);
    assert_eq!(metrics.successful_workflows, 1);
    assert_eq!(metrics.failed_workflows, 1);
    assert_eq!(metrics.total_tasks, 3);
    assert_eq!(metrics.successful_tasks, 2);
    assert_eq!(metrics.failed_tasks, 1);
    assert_eq!(metrics.success_rate, 50.0);
    assert!(metrics.average_execution_time.is_some());
}

#[tokio::test]
async fn test_task_outputs_flow_to_downstream_tasks() {
    use conductor::engine::Task;
    use conductor::tasks::FnExecutor;
    use serde_json::json;

    let mut workflow = Workflow::new("outputs").with_mode(ExecutionMode::Sequential);
    workflow
        .add_task(Task::new(
            "producer",
            FnExecutor::arc(|_ctx| async { Ok(json!({"rows": 42})) }),
        ))
        .unwrap();
    workflow
        .add_task(Task::new(
            "consumer",
            FnExecutor::arc(|ctx| async move {
                let upstream = ctx
                    .output("producer")
                    .await
                    .ok_or_else(|| anyhow::anyhow!("missing upstream output"))?;
                Ok(json!({ "doubled": upstream["rows"].as_i64().unwrap() * 2 }))
            }),
        ))
        .unwrap();
    workflow.add_dependency("consumer", "producer").unwrap();

    let mut engine = WorkflowEngine::new();
    let execution = engine.execute_workflow(&mut workflow).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    let record = execution.record("consumer").unwrap();
    assert_eq!(record.result.as_ref().unwrap()["doubled"], 84);
}

#[tokio::test]
async fn test_reservations_are_released_after_the_run() {
    use conductor::resources::ResourceRequest;

    let mut workflow = Workflow::new("reservations").with_mode(ExecutionMode::Sequential);
    workflow
        .add_task(ok_task("writer").with_resource(ResourceRequest::exclusive("database", "db_conn")))
        .unwrap();

    let mut engine = WorkflowEngine::new();
    let execution = engine.execute_workflow(&mut workflow).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert!(engine
        .reservations()
        .reservations_for("database", "db_conn")
        .await
        .is_empty());
}
