// ABOUTME: Built-in command executor running programs via tokio::process
// ABOUTME: Captures output and validates the exit code against an expected list

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::TaskExecutor;
use crate::engine::TaskContext;

fn default_capture_output() -> bool {
    true
}

fn default_expected_exit_codes() -> Vec<i32> {
    vec![0]
}

/// Parameters accepted by the `command` executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandParams {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default = "default_capture_output")]
    pub capture_output: bool,
    /// Exit codes considered successful (defaults to [0])
    #[serde(default = "default_expected_exit_codes")]
    pub expected_exit_codes: Vec<i32>,
}

pub struct CommandExecutor;

#[async_trait]
impl TaskExecutor for CommandExecutor {
    async fn execute(&self, ctx: TaskContext) -> anyhow::Result<Value> {
        let params: CommandParams = serde_json::from_value(ctx.params.clone())
            .with_context(|| format!("invalid command params for task '{}'", ctx.task_id))?;

        let mut cmd = Command::new(&params.command);
        cmd.args(&params.args);
        for (key, value) in &params.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &params.working_dir {
            cmd.current_dir(dir);
        }

        debug!(
            task = %ctx.task_id,
            command = %params.command,
            args = ?params.args,
            "running command"
        );

        let (exit_code, stdout, stderr) = if params.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            let output = cmd
                .output()
                .await
                .with_context(|| format!("failed to spawn '{}'", params.command))?;
            (
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stdout).to_string(),
                String::from_utf8_lossy(&output.stderr).to_string(),
            )
        } else {
            let status = cmd
                .status()
                .await
                .with_context(|| format!("failed to spawn '{}'", params.command))?;
            (status.code().unwrap_or(-1), String::new(), String::new())
        };

        if !params.expected_exit_codes.contains(&exit_code) {
            bail!(
                "command '{}' exited with unexpected status {}: {}",
                params.command,
                exit_code,
                stderr.trim()
            );
        }

        Ok(json!({
            "exit_code": exit_code,
            "stdout": stdout,
            "stderr": stderr,
        }))
    }

    fn kind(&self) -> &str {
        "command"
    }
}
