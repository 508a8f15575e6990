// ABOUTME: Execution context handed to task executors
// ABOUTME: Carries run identity, task params, workflow variables, and upstream task outputs

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::task::Task;
use super::workflow::Workflow;

/// Context visible to a single task attempt.
///
/// Executors receive a clone per attempt; the outputs map is shared across
/// the run so downstream tasks can read what upstream tasks produced.
#[derive(Clone)]
pub struct TaskContext {
    pub workflow_id: String,
    pub workflow_name: String,
    pub execution_id: String,
    pub task_id: String,
    pub task_name: String,
    pub params: Value,
    pub variables: Arc<HashMap<String, String>>,
    outputs: Arc<RwLock<HashMap<String, Value>>>,
}

impl TaskContext {
    /// Result of a previously completed task, if any.
    pub async fn output(&self, task_id: &str) -> Option<Value> {
        let outputs = self.outputs.read().await;
        outputs.get(task_id).cloned()
    }

    pub async fn outputs(&self) -> HashMap<String, Value> {
        self.outputs.read().await.clone()
    }

    pub fn variable(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }
}

/// Per-run shared state owned by the driving engine.
pub(crate) struct RunScope {
    pub workflow_id: String,
    pub workflow_name: String,
    pub execution_id: String,
    pub variables: Arc<HashMap<String, String>>,
    outputs: Arc<RwLock<HashMap<String, Value>>>,
}

impl RunScope {
    pub(crate) fn new(workflow: &Workflow, execution_id: &str) -> Self {
        Self {
            workflow_id: workflow.id.clone(),
            workflow_name: workflow.name.clone(),
            execution_id: execution_id.to_string(),
            variables: Arc::new(workflow.variables.clone()),
            outputs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub(crate) fn context_for(&self, task: &Task) -> TaskContext {
        TaskContext {
            workflow_id: self.workflow_id.clone(),
            workflow_name: self.workflow_name.clone(),
            execution_id: self.execution_id.clone(),
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            params: task.params.clone(),
            variables: Arc::clone(&self.variables),
            outputs: Arc::clone(&self.outputs),
        }
    }

    pub(crate) async fn record_output(&self, task_id: &str, value: Value) {
        let mut outputs = self.outputs.write().await;
        outputs.insert(task_id.to_string(), value);
    }
}
