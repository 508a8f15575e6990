// ABOUTME: Declarative workflow definitions parsed from YAML
// ABOUTME: Structural validation rejects empty, unknown-dependency, and self-dependent definitions

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::error::{ParserError, Result};
use super::task::TaskConfig;
use crate::engine::{ExecutionMode, FailureStrategy};

fn default_version() -> String {
    "1.0".to_string()
}

fn default_parallel_execution() -> bool {
    true
}

fn default_max_parallel_tasks() -> usize {
    4
}

/// A workflow definition as written in YAML.
///
/// Task order in the file is preserved and becomes the declared order of the
/// runtime workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    /// Declared execution mode; the engine's selector decides when absent.
    #[serde(default)]
    pub mode: Option<ExecutionMode>,
    #[serde(default = "default_parallel_execution")]
    pub parallel_execution: bool,
    #[serde(default = "default_max_parallel_tasks")]
    pub max_parallel_tasks: usize,
    #[serde(default)]
    pub failure_strategy: FailureStrategy,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    pub tasks: IndexMap<String, TaskConfig>,
}

impl WorkflowConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: WorkflowConfig = serde_yaml::from_str(content)?;

        // Fill task names from map keys when not set explicitly
        for (task_id, task_config) in &mut config.tasks {
            if task_config.name.is_none() {
                task_config.name = Some(task_id.clone());
            }
        }

        config.validate_structure()?;
        Ok(config)
    }

    fn validate_structure(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ParserError::MissingField("name".to_string()));
        }
        if self.tasks.is_empty() {
            return Err(ParserError::EmptyWorkflow);
        }

        for (task_id, task_config) in &self.tasks {
            for dependency in &task_config.depends_on {
                if dependency == task_id {
                    return Err(ParserError::SelfDependency {
                        task: task_id.clone(),
                    });
                }
                if !self.tasks.contains_key(dependency) {
                    return Err(ParserError::UnknownDependency {
                        task: task_id.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    pub fn has_dependencies(&self) -> bool {
        self.tasks.values().any(|t| !t.depends_on.is_empty())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
