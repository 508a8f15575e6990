// ABOUTME: Declarative task configuration for YAML workflow definitions
// ABOUTME: Maps onto the runtime Task once the executor name resolves against a registry

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::TaskPriority;
use crate::resources::ResourceRequest;

fn default_max_retries() -> u32 {
    0
}

/// One task entry in a workflow definition.
///
/// `executor` names an entry in the executor registry; resolution happens
/// once, when the runtime workflow is built. `params` stay opaque and are
/// handed to the executor untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    pub executor: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(with = "humantime_serde", default)]
    pub timeout: Option<Duration>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(with = "humantime_serde", default)]
    pub estimated_duration: Option<Duration>,
    #[serde(default)]
    pub resources: Vec<ResourceRequest>,
    #[serde(default)]
    pub params: serde_yaml::Value,
}
