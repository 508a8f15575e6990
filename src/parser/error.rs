// ABOUTME: Error types for workflow definition parsing and structural validation
// ABOUTME: Definition problems are rejected before a runtime workflow is ever built

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("workflow defines no tasks")]
    EmptyWorkflow,

    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("task '{task}' depends on itself")]
    SelfDependency { task: String },
}

pub type Result<T> = std::result::Result<T, ParserError>;
