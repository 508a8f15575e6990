// ABOUTME: Workflow container owning tasks, dependency edges, and run policy
// ABOUTME: Graph mutation is rejected once the first execution has sealed the workflow

use indexmap::IndexMap;
use std::collections::HashMap;
use uuid::Uuid;

use super::error::{ExecutionError, Result};
use super::mode::ExecutionMode;
use super::policy::FailureStrategy;
use super::task::Task;
use crate::parser::WorkflowConfig;
use crate::tasks::ExecutorRegistry;

/// A named set of tasks with dependency edges and run policy.
///
/// Task order in the map is declared order; engines use it for deterministic
/// tie-breaking. The workflow seals itself when its first execution starts:
/// membership and edges are frozen from then on, while task state still
/// resets between runs.
#[derive(Debug)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Declared strategy; the mode selector decides when unset.
    pub mode: Option<ExecutionMode>,
    pub parallel_execution: bool,
    pub max_parallel_tasks: usize,
    pub failure_strategy: FailureStrategy,
    pub variables: HashMap<String, String>,
    tasks: IndexMap<String, Task>,
    sealed: bool,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            mode: None,
            parallel_execution: true,
            max_parallel_tasks: 4,
            failure_strategy: FailureStrategy::default(),
            variables: HashMap::new(),
            tasks: IndexMap::new(),
            sealed: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_max_parallel_tasks(mut self, limit: usize) -> Self {
        self.max_parallel_tasks = limit;
        self
    }

    pub fn with_failure_strategy(mut self, strategy: FailureStrategy) -> Self {
        self.failure_strategy = strategy;
        self
    }

    /// Build a runtime workflow from a declarative config, resolving each
    /// task's executor name against the registry exactly once.
    pub fn from_config(config: &WorkflowConfig, registry: &ExecutorRegistry) -> Result<Self> {
        let mut workflow = Workflow::new(config.name.clone());
        workflow.description = config.description.clone();
        workflow.mode = config.mode;
        workflow.parallel_execution = config.parallel_execution;
        workflow.max_parallel_tasks = config.max_parallel_tasks;
        workflow.failure_strategy = config.failure_strategy;
        workflow.variables = config.variables.clone();

        for (task_id, task_config) in &config.tasks {
            let executor = registry.resolve(&task_config.executor)?;
            let params = serde_json::to_value(&task_config.params).map_err(|e| {
                ExecutionError::InvalidConfiguration {
                    task_id: task_id.clone(),
                    reason: format!("params are not JSON-representable: {}", e),
                }
            })?;

            let mut task = Task::new(task_id.clone(), executor)
                .with_name(
                    task_config
                        .name
                        .clone()
                        .unwrap_or_else(|| task_id.clone()),
                )
                .with_priority(task_config.priority)
                .with_max_retries(task_config.max_retries)
                .with_params(params);
            if let Some(timeout) = task_config.timeout {
                task = task.with_timeout(timeout);
            }
            if let Some(estimate) = task_config.estimated_duration {
                task = task.with_estimated_duration(estimate);
            }
            for request in &task_config.resources {
                task = task.with_resource(request.clone());
            }

            workflow.add_task(task)?;
        }

        for (task_id, task_config) in &config.tasks {
            for dependency in &task_config.depends_on {
                workflow.add_dependency(task_id, dependency)?;
            }
        }

        Ok(workflow)
    }

    pub fn add_task(&mut self, task: Task) -> Result<()> {
        if self.sealed {
            return Err(ExecutionError::WorkflowLocked {
                workflow_id: self.id.clone(),
            });
        }
        if self.tasks.contains_key(&task.id) {
            return Err(ExecutionError::DuplicateTask {
                workflow_id: self.id.clone(),
                task_id: task.id,
            });
        }
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Record that `task_id` depends on `depends_on`, keeping the dependent
    /// set of the dependency symmetric with it.
    pub fn add_dependency(&mut self, task_id: &str, depends_on: &str) -> Result<()> {
        if self.sealed {
            return Err(ExecutionError::WorkflowLocked {
                workflow_id: self.id.clone(),
            });
        }
        if !self.tasks.contains_key(task_id) {
            return Err(ExecutionError::TaskNotFound {
                task_id: task_id.to_string(),
            });
        }
        if !self.tasks.contains_key(depends_on) {
            return Err(ExecutionError::DependencyNotFound {
                task_id: task_id.to_string(),
                dependency: depends_on.to_string(),
            });
        }
        if task_id == depends_on {
            return Err(ExecutionError::CycleDetected {
                tasks: vec![task_id.to_string()],
            });
        }

        self.tasks[task_id].dependencies.insert(depends_on.to_string());
        self.tasks[depends_on].dependents.insert(task_id.to_string());
        Ok(())
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub(crate) fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(task_id)
    }

    /// Tasks in declared order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn has_dependencies(&self) -> bool {
        self.tasks.values().any(|t| !t.dependencies.is_empty())
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    pub(crate) fn reset_tasks(&mut self) {
        for task in self.tasks.values_mut() {
            task.reset();
        }
    }
}
