// ABOUTME: Hybrid leveled strategy: launch a dependency level together, join the barrier, repeat
// ABOUTME: Critical failures abort after the level's barrier, before the next level starts

use tokio::task::JoinSet;
use tracing::{info, warn};

use super::dependency::DependencyGraph;
use super::error::Result;
use super::execution::{Execution, TaskRunRecord};
use super::runtime::{self, EngineShared};
use super::workflow::Workflow;

/// Run the workflow level by level. Each level's tasks launch together and
/// the barrier waits for all of them, success or failure, before the policy
/// decides whether the next level starts. Returns true when the run aborted.
pub(crate) async fn run(
    workflow: &mut Workflow,
    execution: &mut Execution,
    shared: &EngineShared<'_>,
) -> Result<bool> {
    let levels = DependencyGraph::from_workflow(workflow).levels()?;
    info!(levels = levels.len(), tasks = workflow.len(), "running workflow by dependency level");

    for (index, level) in levels.iter().enumerate() {
        let mut join_set: JoinSet<TaskRunRecord> = JoinSet::new();
        let mut launched = 0usize;

        for task_id in level {
            if !runtime::dependencies_completed(workflow, task_id) {
                warn!(task = %task_id, level = index, "skipping task: dependencies did not complete");
                continue;
            }

            let (spec, executor, ctx) = runtime::admit(workflow, execution, shared, task_id).await;
            let supervisor = shared.supervisor.clone();
            join_set.spawn(async move { supervisor.run_task(spec, executor, ctx).await });
            launched += 1;
        }

        info!(level = index, launched, "level launched, waiting on barrier");

        // Barrier: the level always drains fully, even past a critical failure
        let mut abort_after_barrier = false;
        while let Some(result) = join_set.join_next().await {
            let record = result?;
            if runtime::apply_outcome(workflow, execution, shared, record).await {
                abort_after_barrier = true;
            }
        }

        if abort_after_barrier {
            return Ok(true);
        }
    }

    Ok(false)
}
