// ABOUTME: Failure policy governing whether a task failure aborts the run
// ABOUTME: StopOnCritical aborts on critical/urgent failures and downgrades the rest to warnings

use serde::{Deserialize, Serialize};
use std::fmt;

use super::task::TaskPriority;

/// What a workflow does when one of its tasks fails.
///
/// `RetryFailed` is accepted in configuration but behaves as `Continue`:
/// per-task retry is the supervisor's job, and re-running a whole workflow is
/// left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    #[default]
    StopOnCritical,
    Continue,
    RetryFailed,
}

/// Decision the policy hands back to the driving engine for one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Abort the run; nothing scheduled after this point starts.
    Abort,
    /// Record a warning and keep going.
    Record,
}

impl FailureStrategy {
    pub fn on_failure(self, priority: TaskPriority) -> FailureAction {
        match self {
            FailureStrategy::StopOnCritical if priority.is_critical() => FailureAction::Abort,
            FailureStrategy::StopOnCritical => FailureAction::Record,
            FailureStrategy::Continue | FailureStrategy::RetryFailed => FailureAction::Record,
        }
    }
}

impl fmt::Display for FailureStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStrategy::StopOnCritical => write!(f, "stop_on_critical"),
            FailureStrategy::Continue => write!(f, "continue"),
            FailureStrategy::RetryFailed => write!(f, "retry_failed"),
        }
    }
}
