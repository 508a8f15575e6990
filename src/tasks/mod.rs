// ABOUTME: Executor seam between the engine and opaque task bodies
// ABOUTME: Provides the TaskExecutor trait, a closure adapter, and the by-name registry

pub mod command;

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::error::{ExecutionError, Result};
use crate::engine::TaskContext;

/// An opaque asynchronous task body.
///
/// The engine never inspects an executor's internals; it only awaits the
/// returned future under the supervisor's timeout and maps the outcome onto
/// the task record.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, ctx: TaskContext) -> anyhow::Result<serde_json::Value>;

    /// Registry name for by-name bindings; direct bindings keep the default.
    fn kind(&self) -> &str {
        "inline"
    }
}

impl std::fmt::Debug for dyn TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("kind", &self.kind())
            .finish()
    }
}

/// Adapts an async closure into a [`TaskExecutor`] for direct bindings.
pub struct FnExecutor {
    func: Box<
        dyn Fn(TaskContext) -> BoxFuture<'static, anyhow::Result<serde_json::Value>> + Send + Sync,
    >,
}

impl FnExecutor {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        Self {
            func: Box::new(move |ctx| Box::pin(func(ctx))),
        }
    }

    pub fn arc<F, Fut>(func: F) -> Arc<dyn TaskExecutor>
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        Arc::new(Self::new(func))
    }
}

#[async_trait]
impl TaskExecutor for FnExecutor {
    async fn execute(&self, ctx: TaskContext) -> anyhow::Result<serde_json::Value> {
        (self.func)(ctx).await
    }
}

/// Named executor registry for declarative workflows.
///
/// Names are resolved exactly once, when a task is constructed; tasks hold
/// the resolved handle afterwards.
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    /// Registry with the built-in executors registered.
    pub fn new() -> Self {
        let mut registry = Self {
            executors: HashMap::new(),
        };
        registry.register("command", Arc::new(command::CommandExecutor));
        registry
    }

    /// Registry with nothing registered, for callers supplying their own set.
    pub fn empty() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn TaskExecutor>) {
        self.executors.insert(name.into(), executor);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskExecutor>> {
        self.executors.get(name).map(Arc::clone)
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn TaskExecutor>> {
        self.get(name).ok_or_else(|| ExecutionError::ExecutorNotFound {
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.executors.keys().map(|k| k.as_str()).collect()
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
