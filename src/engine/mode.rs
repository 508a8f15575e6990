// ABOUTME: Execution mode resolution: declared mode, optional suggestion collaborator, heuristic
// ABOUTME: An invalid declared mode is fatal; an invalid suggestion silently falls back

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::error::ExecutionError;
use super::workflow::Workflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Sequential,
    #[serde(alias = "parallel")]
    Concurrent,
    #[serde(alias = "hybrid")]
    Leveled,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Concurrent => "concurrent",
            ExecutionMode::Leveled => "leveled",
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = ExecutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" | "concurrent" => Ok(ExecutionMode::Concurrent),
            "hybrid" | "leveled" => Ok(ExecutionMode::Leveled),
            other => Err(ExecutionError::UnknownExecutionMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Facts about a workflow handed to the suggestion collaborator.
#[derive(Debug, Clone)]
pub struct ModeQuery {
    pub workflow_name: String,
    pub description: Option<String>,
    pub task_count: usize,
    pub has_dependencies: bool,
}

impl ModeQuery {
    pub fn for_workflow(workflow: &Workflow) -> Self {
        Self {
            workflow_name: workflow.name.clone(),
            description: workflow.description.clone(),
            task_count: workflow.len(),
            has_dependencies: workflow.has_dependencies(),
        }
    }
}

/// Optional external collaborator asked for a mode when none is declared.
///
/// Returning `None` or anything that is not "sequential", "parallel", or
/// "hybrid" defers to the fallback heuristic.
#[async_trait]
pub trait ModeSuggestion: Send + Sync {
    async fn suggest(&self, query: &ModeQuery) -> Option<String>;
}

/// Resolve the mode for a run: declared mode wins, then a valid suggestion,
/// then the heuristic.
pub async fn select_mode(
    workflow: &Workflow,
    suggestion: Option<&dyn ModeSuggestion>,
) -> ExecutionMode {
    if let Some(mode) = workflow.mode {
        return mode;
    }

    if let Some(collaborator) = suggestion {
        let query = ModeQuery::for_workflow(workflow);
        if let Some(value) = collaborator.suggest(&query).await {
            match value.parse() {
                Ok(mode) => {
                    debug!(workflow = %workflow.name, %mode, "using suggested execution mode");
                    return mode;
                }
                Err(_) => {
                    debug!(
                        workflow = %workflow.name,
                        suggestion = %value,
                        "ignoring invalid mode suggestion"
                    );
                }
            }
        }
    }

    fallback_mode(workflow)
}

/// Heuristic used when nothing is declared or suggested: dependency graphs
/// with more than one task run leveled, degenerate dependency chains run
/// sequentially, independent task sets run concurrently.
pub fn fallback_mode(workflow: &Workflow) -> ExecutionMode {
    if !workflow.parallel_execution {
        return ExecutionMode::Sequential;
    }
    if workflow.has_dependencies() {
        if workflow.len() > 1 {
            ExecutionMode::Leveled
        } else {
            ExecutionMode::Sequential
        }
    } else {
        ExecutionMode::Concurrent
    }
}
