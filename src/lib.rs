// ABOUTME: Dependency-aware task orchestration engine with pluggable execution strategies
// ABOUTME: Exposes the engine, executor seam, reservations, metrics, and the declarative parser

pub mod cli;
pub mod engine;
pub mod metrics;
pub mod parser;
pub mod resources;
pub mod tasks;

// Re-export commonly used types
pub use engine::{
    Execution, ExecutionMode, ExecutionStatus, FailureStrategy, Task, TaskPriority, TaskStatus,
    Workflow, WorkflowEngine,
};
pub use metrics::MetricsSnapshot;
pub use parser::WorkflowConfig;
pub use resources::{ReservationManager, ResourceRequest};
pub use tasks::{ExecutorRegistry, FnExecutor, TaskExecutor};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
