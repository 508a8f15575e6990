// ABOUTME: Implementations of the run, validate, and plan subcommands
// ABOUTME: Bridges YAML definitions to the engine and renders execution results

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::engine::{
    DependencyGraph, Execution, ExecutionStatus, Workflow, WorkflowEngine,
};
use crate::parser::WorkflowConfig;
use crate::tasks::ExecutorRegistry;

/// Execute a workflow file and print the outcome.
pub async fn run(
    workflow_path: &Path,
    variables: HashMap<String, String>,
    mode: Option<String>,
    max_parallel: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = WorkflowConfig::from_file(workflow_path)
        .with_context(|| format!("failed to load workflow from {}", workflow_path.display()))?;
    let registry = ExecutorRegistry::new();
    let mut workflow = Workflow::from_config(&config, &registry)?;

    // CLI variables override workflow variables
    workflow.variables.extend(variables);
    if let Some(mode) = mode {
        workflow.mode = Some(mode.parse()?);
    }
    if let Some(limit) = max_parallel {
        workflow.max_parallel_tasks = limit;
    }

    let mut engine = WorkflowEngine::new();
    let execution = engine.execute_workflow(&mut workflow).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&execution)?);
    } else {
        print_summary(&execution);
    }

    if execution.status == ExecutionStatus::Failed {
        bail!("workflow '{}' failed", execution.workflow_name);
    }
    Ok(())
}

/// Parse and structurally validate a workflow file, including cycle detection.
pub fn validate(workflow_path: &Path) -> Result<()> {
    let config = WorkflowConfig::from_file(workflow_path)
        .with_context(|| format!("failed to load workflow from {}", workflow_path.display()))?;
    let registry = ExecutorRegistry::new();
    let workflow = Workflow::from_config(&config, &registry)?;
    DependencyGraph::from_workflow(&workflow).topological_order()?;

    info!(workflow = %workflow.name, "workflow validated");
    println!(
        "OK: workflow '{}' with {} task(s) is valid",
        workflow.name,
        workflow.len()
    );
    Ok(())
}

/// Print the topological order and dependency levels without executing.
pub fn plan(workflow_path: &Path) -> Result<()> {
    let config = WorkflowConfig::from_file(workflow_path)
        .with_context(|| format!("failed to load workflow from {}", workflow_path.display()))?;
    let registry = ExecutorRegistry::new();
    let workflow = Workflow::from_config(&config, &registry)?;
    let graph = DependencyGraph::from_workflow(&workflow);

    let order = graph.topological_order()?;
    let levels = graph.levels()?;

    println!("Workflow: {}", workflow.name);
    println!("Topological order: {}", order.join(" -> "));
    println!("Dependency levels:");
    for (index, level) in levels.iter().enumerate() {
        println!("  {}: {}", index, level.join(", "));
    }
    Ok(())
}

fn print_summary(execution: &Execution) {
    println!(
        "Workflow '{}' finished with status: {}",
        execution.workflow_name, execution.status
    );
    println!(
        "  mode: {}, completed: {}, failed: {}, duration: {:?}",
        execution.mode,
        execution.completed_count(),
        execution.failed_count(),
        execution.duration.unwrap_or_default()
    );

    let mut records: Vec<_> = execution.results.values().collect();
    records.sort_by_key(|r| r.started_at);
    for record in records {
        let detail = match &record.error {
            Some(error) => format!(" ({})", error),
            None => String::new(),
        };
        println!(
            "  [{}] {} in {:?}, retries: {}{}",
            record.status, record.task_id, record.duration, record.retry_count, detail
        );
    }

    for warning in &execution.warnings {
        println!("  warning: {}", warning);
    }
    for error in &execution.errors {
        println!("  error: {}", error);
    }
}
