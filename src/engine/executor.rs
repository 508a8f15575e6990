// ABOUTME: Workflow engine facade wiring mode selection, strategies, reservations, and metrics
// ABOUTME: Each engine is constructed explicitly; no process-wide orchestrator state exists

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

use super::concurrent;
use super::context::RunScope;
use super::dependency::DependencyGraph;
use super::error::{ExecutionError, Result};
use super::execution::{Execution, ExecutionStatus};
use super::leveled;
use super::mode::{select_mode, ExecutionMode, ModeSuggestion};
use super::runtime::EngineShared;
use super::sequential;
use super::supervisor::TaskSupervisor;
use super::task::TaskStatus;
use super::workflow::Workflow;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::resources::ReservationManager;

/// Orchestrates workflow runs.
///
/// Owns the supervisor, the reservation manager, the metrics collector, and
/// any registered workflows with their execution history. Construct one per
/// scheduling domain; nothing here is global.
pub struct WorkflowEngine {
    supervisor: TaskSupervisor,
    reservations: ReservationManager,
    metrics: MetricsCollector,
    mode_suggestion: Option<Arc<dyn ModeSuggestion>>,
    workflows: HashMap<String, Workflow>,
    history: HashMap<String, Vec<Execution>>,
}

impl WorkflowEngine {
    pub fn new() -> Self {
        Self {
            supervisor: TaskSupervisor::new(),
            reservations: ReservationManager::new(),
            metrics: MetricsCollector::new(),
            mode_suggestion: None,
            workflows: HashMap::new(),
            history: HashMap::new(),
        }
    }

    pub fn with_supervisor(mut self, supervisor: TaskSupervisor) -> Self {
        self.supervisor = supervisor;
        self
    }

    pub fn with_reservation_manager(mut self, reservations: ReservationManager) -> Self {
        self.reservations = reservations;
        self
    }

    pub fn with_mode_suggestion(mut self, suggestion: Arc<dyn ModeSuggestion>) -> Self {
        self.mode_suggestion = Some(suggestion);
        self
    }

    /// Register a workflow for execution by id. Returns the workflow id.
    pub fn register_workflow(&mut self, workflow: Workflow) -> String {
        let id = workflow.id.clone();
        self.workflows.insert(id.clone(), workflow);
        id
    }

    pub fn workflow(&self, workflow_id: &str) -> Option<&Workflow> {
        self.workflows.get(workflow_id)
    }

    /// Execute a registered workflow.
    #[instrument(skip(self))]
    pub async fn execute(&mut self, workflow_id: &str) -> Result<Execution> {
        let workflow = self.workflows.get_mut(workflow_id).ok_or_else(|| {
            ExecutionError::WorkflowNotFound {
                workflow_id: workflow_id.to_string(),
            }
        })?;

        let execution = run_workflow(
            workflow,
            &self.supervisor,
            &self.reservations,
            self.mode_suggestion.as_deref(),
        )
        .await?;

        self.metrics.record_execution(&execution).await;
        self.history
            .entry(execution.workflow_id.clone())
            .or_default()
            .push(execution.clone());
        Ok(execution)
    }

    /// Execute a caller-owned workflow without registering it.
    pub async fn execute_workflow(&mut self, workflow: &mut Workflow) -> Result<Execution> {
        let execution = run_workflow(
            workflow,
            &self.supervisor,
            &self.reservations,
            self.mode_suggestion.as_deref(),
        )
        .await?;

        self.metrics.record_execution(&execution).await;
        self.history
            .entry(execution.workflow_id.clone())
            .or_default()
            .push(execution.clone());
        Ok(execution)
    }

    /// Status of a registered workflow and its most recent execution.
    pub fn workflow_status(&self, workflow_id: &str) -> Option<WorkflowStatusReport> {
        let workflow = self.workflows.get(workflow_id)?;
        Some(WorkflowStatusReport {
            workflow_id: workflow.id.clone(),
            workflow_name: workflow.name.clone(),
            task_count: workflow.len(),
            latest_execution: self
                .history
                .get(workflow_id)
                .and_then(|runs| runs.last())
                .map(ExecutionSummary::from_execution),
        })
    }

    pub fn executions(&self, workflow_id: &str) -> &[Execution] {
        self.history
            .get(workflow_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub async fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot().await
    }

    pub fn reservations(&self) -> &ReservationManager {
        &self.reservations
    }
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatusReport {
    pub workflow_id: String,
    pub workflow_name: String,
    pub task_count: usize,
    pub latest_execution: Option<ExecutionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub completed_count: usize,
    pub failed_count: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionSummary {
    fn from_execution(execution: &Execution) -> Self {
        Self {
            execution_id: execution.id.clone(),
            status: execution.status,
            completed_count: execution.completed_count(),
            failed_count: execution.failed_count(),
            started_at: execution.started_at,
            completed_at: execution.completed_at,
        }
    }
}

/// Drive one run end to end: validate, pick the mode, seal, dispatch, settle.
///
/// Cycle detection happens before the execution record exists; from then on
/// the caller always gets the populated record back, aborted runs included.
async fn run_workflow(
    workflow: &mut Workflow,
    supervisor: &TaskSupervisor,
    reservations: &ReservationManager,
    suggestion: Option<&dyn ModeSuggestion>,
) -> Result<Execution> {
    DependencyGraph::from_workflow(workflow).topological_order()?;

    let mode = select_mode(workflow, suggestion).await;
    workflow.seal();
    workflow.reset_tasks();

    let mut execution = Execution::new(&workflow.id, &workflow.name, mode);
    info!(
        workflow = %workflow.name,
        run = %execution.id,
        %mode,
        tasks = workflow.len(),
        "starting workflow execution"
    );

    let scope = RunScope::new(workflow, &execution.id);
    let shared = EngineShared {
        supervisor,
        reservations,
        scope: &scope,
    };

    let aborted = match mode {
        ExecutionMode::Sequential => sequential::run(workflow, &mut execution, &shared).await?,
        ExecutionMode::Concurrent => concurrent::run(workflow, &mut execution, &shared).await?,
        ExecutionMode::Leveled => leveled::run(workflow, &mut execution, &shared).await?,
    };

    if !aborted {
        for task in workflow.tasks() {
            if task.status == TaskStatus::Pending {
                execution.add_warning(format!(
                    "task '{}' was never started: dependencies did not complete",
                    task.id
                ));
            }
        }
    }

    execution.finalize(aborted);
    info!(
        run = %execution.id,
        status = %execution.status,
        completed = execution.completed_count(),
        failed = execution.failed_count(),
        duration = ?execution.duration,
        "workflow execution finished"
    );
    Ok(execution)
}
