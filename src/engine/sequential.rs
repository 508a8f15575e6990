// ABOUTME: Sequential strategy driving the topological order one task at a time
// ABOUTME: Critical failures abort under StopOnCritical; the rest downgrade to warnings

use tracing::{info, warn};

use super::dependency::DependencyGraph;
use super::error::Result;
use super::execution::Execution;
use super::runtime::{self, EngineShared};
use super::workflow::Workflow;

/// Run every task in topological order, one at a time. Returns true when the
/// run aborted.
pub(crate) async fn run(
    workflow: &mut Workflow,
    execution: &mut Execution,
    shared: &EngineShared<'_>,
) -> Result<bool> {
    let order = DependencyGraph::from_workflow(workflow).topological_order()?;
    info!(tasks = order.len(), "running workflow sequentially");

    for task_id in order {
        if !runtime::dependencies_completed(workflow, &task_id) {
            warn!(task = %task_id, "skipping task: dependencies did not complete");
            continue;
        }

        let (spec, executor, ctx) = runtime::admit(workflow, execution, shared, &task_id).await;
        let record = shared.supervisor.run_task(spec, executor, ctx).await;

        if runtime::apply_outcome(workflow, execution, shared, record).await {
            return Ok(true);
        }
    }

    Ok(false)
}
