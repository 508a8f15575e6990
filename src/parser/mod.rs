// ABOUTME: Declarative workflow definition parsing for conductor
// ABOUTME: YAML definitions validate structurally before a runtime workflow is built

pub mod error;
pub mod task;
pub mod workflow;

pub use error::{ParserError, Result};
pub use task::TaskConfig;
pub use workflow::WorkflowConfig;
