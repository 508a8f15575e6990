// ABOUTME: Rolling metrics over completed workflow runs
// ABOUTME: Counters plus a bounded duration window for the average execution time

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::engine::{Execution, ExecutionStatus};

/// Point-in-time view of the collector, shaped for the metrics query.
#[derive(Debug, Clone, Serialize, Default)]
pub struct MetricsSnapshot {
    pub total_workflows: u64,
    pub successful_workflows: u64,
    pub failed_workflows: u64,
    pub total_tasks: u64,
    pub successful_tasks: u64,
    pub failed_tasks: u64,
    pub average_execution_time: Option<Duration>,
    pub success_rate: f64,
    pub task_success_rate: f64,
}

#[derive(Debug, Default)]
struct MetricsState {
    total_workflows: u64,
    successful_workflows: u64,
    failed_workflows: u64,
    total_tasks: u64,
    successful_tasks: u64,
    failed_tasks: u64,
    recent_durations: VecDeque<Duration>,
}

/// Aggregates completed runs. Cloning shares the underlying state, so the
/// engine and its callers observe the same counters.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    state: Arc<RwLock<MetricsState>>,
    retention_limit: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MetricsState::default())),
            retention_limit: 1000,
        }
    }

    pub fn with_retention_limit(mut self, limit: usize) -> Self {
        self.retention_limit = limit.max(1);
        self
    }

    pub async fn record_execution(&self, execution: &Execution) {
        let mut state = self.state.write().await;

        state.total_workflows += 1;
        match execution.status {
            ExecutionStatus::Completed => state.successful_workflows += 1,
            ExecutionStatus::Failed => state.failed_workflows += 1,
            // Partial successes and still-running records count toward totals only
            _ => {}
        }

        state.total_tasks += (execution.completed_count() + execution.failed_count()) as u64;
        state.successful_tasks += execution.completed_count() as u64;
        state.failed_tasks += execution.failed_count() as u64;

        if let Some(duration) = execution.duration {
            state.recent_durations.push_back(duration);
            while state.recent_durations.len() > self.retention_limit {
                state.recent_durations.pop_front();
            }
        }
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.read().await;

        let average_execution_time = if state.recent_durations.is_empty() {
            None
        } else {
            let total: Duration = state.recent_durations.iter().sum();
            Some(total / state.recent_durations.len() as u32)
        };

        let success_rate = if state.total_workflows > 0 {
            state.successful_workflows as f64 / state.total_workflows as f64 * 100.0
        } else {
            0.0
        };
        let task_success_rate = if state.total_tasks > 0 {
            state.successful_tasks as f64 / state.total_tasks as f64 * 100.0
        } else {
            0.0
        };

        MetricsSnapshot {
            total_workflows: state.total_workflows,
            successful_workflows: state.successful_workflows,
            failed_workflows: state.failed_workflows,
            total_tasks: state.total_tasks,
            successful_tasks: state.successful_tasks,
            failed_tasks: state.failed_tasks,
            average_execution_time,
            success_rate,
            task_success_rate,
        }
    }

    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = MetricsState::default();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
