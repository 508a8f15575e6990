// ABOUTME: Core task data model with priority, status, and dependency bookkeeping
// ABOUTME: Tasks carry their resolved executor and are mutated only by the engine driving a run

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::resources::ResourceRequest;
use crate::tasks::TaskExecutor;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
    Urgent,
}

impl TaskPriority {
    /// Critical and urgent tasks abort the run on failure under `StopOnCritical`.
    pub fn is_critical(self) -> bool {
        matches!(self, TaskPriority::Critical | TaskPriority::Urgent)
    }

    /// Numeric weight used when claiming resource reservations.
    pub fn reservation_weight(self) -> u8 {
        match self {
            TaskPriority::Low => 1,
            TaskPriority::Normal => 3,
            TaskPriority::High => 5,
            TaskPriority::Critical => 7,
            TaskPriority::Urgent => 9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Normal => "normal",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A single schedulable unit of work.
///
/// The executor handle is opaque to the engine: it is resolved exactly once at
/// construction (directly or by registry name) and invoked through the
/// supervisor. Dependency and dependent sets are kept mutually symmetric by
/// [`Workflow::add_dependency`](crate::engine::Workflow::add_dependency).
pub struct Task {
    pub id: String,
    pub name: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub dependencies: IndexSet<String>,
    pub dependents: IndexSet<String>,
    pub timeout: Option<Duration>,
    pub max_retries: u32,
    pub retry_count: u32,
    pub estimated_duration: Option<Duration>,
    pub actual_duration: Option<Duration>,
    pub resources: Vec<ResourceRequest>,
    pub params: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    executor: Arc<dyn TaskExecutor>,
}

impl Task {
    pub fn new(id: impl Into<String>, executor: Arc<dyn TaskExecutor>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            priority: TaskPriority::Normal,
            status: TaskStatus::Pending,
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
            timeout: None,
            max_retries: 0,
            retry_count: 0,
            estimated_duration: None,
            actual_duration: None,
            resources: Vec::new(),
            params: serde_json::Value::Null,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
            executor,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_estimated_duration(mut self, estimate: Duration) -> Self {
        self.estimated_duration = Some(estimate);
        self
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_resource(mut self, request: ResourceRequest) -> Self {
        self.resources.push(request);
        self
    }

    /// Handle to the task's executor, shared with spawned attempts.
    pub fn executor(&self) -> Arc<dyn TaskExecutor> {
        Arc::clone(&self.executor)
    }

    pub fn is_critical(&self) -> bool {
        self.priority.is_critical()
    }

    /// Clear per-run state so the owning workflow can execute again.
    pub(crate) fn reset(&mut self) {
        self.status = TaskStatus::Pending;
        self.retry_count = 0;
        self.actual_duration = None;
        self.result = None;
        self.error = None;
        self.started_at = None;
        self.completed_at = None;
    }

    pub(crate) fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("status", &self.status)
            .field("dependencies", &self.dependencies)
            .field("dependents", &self.dependents)
            .field("max_retries", &self.max_retries)
            .field("retry_count", &self.retry_count)
            .finish_non_exhaustive()
    }
}
