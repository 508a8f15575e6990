// ABOUTME: Execution records aggregating per-task outcomes for one workflow run
// ABOUTME: One record per invocation; aborts mark the record failed before it is returned

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use super::mode::ExecutionMode;
use super::task::TaskStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    PartialSuccess,
    Failed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::PartialSuccess => write!(f, "partial_success"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one supervised task, as applied to the workflow and execution.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRunRecord {
    pub task_id: String,
    pub status: TaskStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
}

impl TaskRunRecord {
    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Record of a single workflow invocation.
///
/// Callers always receive the populated record, aborted runs included; only
/// fatal schedule-time conditions produce an error with no record at all.
#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    pub id: String,
    pub workflow_id: String,
    pub workflow_name: String,
    pub mode: ExecutionMode,
    pub status: ExecutionStatus,
    pub current_tasks: Vec<String>,
    pub completed_tasks: Vec<String>,
    pub failed_tasks: Vec<String>,
    pub results: HashMap<String, TaskRunRecord>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
}

impl Execution {
    pub(crate) fn new(workflow_id: &str, workflow_name: &str, mode: ExecutionMode) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.to_string(),
            workflow_name: workflow_name.to_string(),
            mode,
            status: ExecutionStatus::Running,
            current_tasks: Vec::new(),
            completed_tasks: Vec::new(),
            failed_tasks: Vec::new(),
            results: HashMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            duration: None,
        }
    }

    pub(crate) fn task_started(&mut self, task_id: &str) {
        self.current_tasks.push(task_id.to_string());
    }

    pub(crate) fn apply_record(&mut self, record: TaskRunRecord) {
        self.current_tasks.retain(|id| id != &record.task_id);
        match record.status {
            TaskStatus::Completed => self.completed_tasks.push(record.task_id.clone()),
            _ => self.failed_tasks.push(record.task_id.clone()),
        }
        self.results.insert(record.task_id.clone(), record);
    }

    pub(crate) fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub(crate) fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub(crate) fn finalize(&mut self, aborted: bool) {
        let now = Utc::now();
        self.completed_at = Some(now);
        self.duration = (now - self.started_at).to_std().ok();
        self.current_tasks.clear();

        self.status = if aborted {
            ExecutionStatus::Failed
        } else if self.failed_tasks.is_empty() {
            ExecutionStatus::Completed
        } else if self.completed_tasks.is_empty() {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::PartialSuccess
        };
    }

    pub fn record(&self, task_id: &str) -> Option<&TaskRunRecord> {
        self.results.get(task_id)
    }

    pub fn completed_count(&self) -> usize {
        self.completed_tasks.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed_tasks.len()
    }

    pub fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(task_id: &str, status: TaskStatus) -> TaskRunRecord {
        let now = Utc::now();
        TaskRunRecord {
            task_id: task_id.to_string(),
            status,
            result: None,
            error: None,
            retry_count: 0,
            started_at: now,
            finished_at: now,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_records_partition_into_completed_and_failed() {
        let mut execution = Execution::new("wf-1", "test", ExecutionMode::Sequential);
        execution.task_started("a");
        execution.task_started("b");
        execution.apply_record(record("a", TaskStatus::Completed));
        execution.apply_record(record("b", TaskStatus::Failed));

        assert!(execution.current_tasks.is_empty());
        assert_eq!(execution.completed_tasks, vec!["a"]);
        assert_eq!(execution.failed_tasks, vec!["b"]);
        assert_eq!(execution.completed_count(), 1);
        assert_eq!(execution.failed_count(), 1);
    }

    #[test]
    fn test_finalize_status_rules() {
        let mut clean = Execution::new("wf", "t", ExecutionMode::Sequential);
        clean.apply_record(record("a", TaskStatus::Completed));
        clean.finalize(false);
        assert_eq!(clean.status, ExecutionStatus::Completed);

        let mut mixed = Execution::new("wf", "t", ExecutionMode::Sequential);
        mixed.apply_record(record("a", TaskStatus::Completed));
        mixed.apply_record(record("b", TaskStatus::Failed));
        mixed.finalize(false);
        assert_eq!(mixed.status, ExecutionStatus::PartialSuccess);

        let mut all_failed = Execution::new("wf", "t", ExecutionMode::Sequential);
        all_failed.apply_record(record("a", TaskStatus::Failed));
        all_failed.finalize(false);
        assert_eq!(all_failed.status, ExecutionStatus::Failed);

        let mut aborted = Execution::new("wf", "t", ExecutionMode::Sequential);
        aborted.apply_record(record("a", TaskStatus::Completed));
        aborted.finalize(true);
        assert_eq!(aborted.status, ExecutionStatus::Failed);
        assert!(!aborted.succeeded());
    }
}
