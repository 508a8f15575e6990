// ABOUTME: Error types for workflow scheduling and task execution
// ABOUTME: Fatal schedule-time errors reject a run before any execution record exists

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("circular dependency detected involving tasks: {tasks:?}")]
    CycleDetected { tasks: Vec<String> },

    #[error("task '{task_id}' depends on unknown task '{dependency}'")]
    DependencyNotFound { task_id: String, dependency: String },

    #[error("task '{task_id}' timed out after {timeout:?}")]
    TaskTimeout { task_id: String, timeout: Duration },

    #[error("task '{task_id}' failed: {message}")]
    TaskFailed { task_id: String, message: String },

    #[error("workflow execution aborted: {reason}")]
    WorkflowAborted { reason: String },

    #[error("unknown execution mode '{mode}' (expected sequential, parallel, or hybrid)")]
    UnknownExecutionMode { mode: String },

    #[error("no executor registered under '{name}'")]
    ExecutorNotFound { name: String },

    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("invalid configuration for task '{task_id}': {reason}")]
    InvalidConfiguration { task_id: String, reason: String },

    #[error("workflow not found: {workflow_id}")]
    WorkflowNotFound { workflow_id: String },

    #[error("workflow '{workflow_id}' already contains task '{task_id}'")]
    DuplicateTask { workflow_id: String, task_id: String },

    #[error(
        "workflow '{workflow_id}' is sealed; the graph cannot change once execution has started"
    )]
    WorkflowLocked { workflow_id: String },

    #[error("join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
