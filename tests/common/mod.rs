// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Builds tasks around closure executors that track order, concurrency, and failures

#![allow(dead_code)]

use conductor::engine::{Task, TaskSupervisor, WorkflowEngine};
use conductor::tasks::FnExecutor;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Engine with millisecond backoff so retry tests finish quickly.
pub fn fast_engine() -> WorkflowEngine {
    WorkflowEngine::new().with_supervisor(
        TaskSupervisor::new().with_backoff(Duration::from_millis(1), Duration::from_millis(8)),
    )
}

pub fn ok_task(id: &str) -> Task {
    Task::new(
        id,
        FnExecutor::arc(|ctx| async move { Ok(json!({ "task": ctx.task_id })) }),
    )
}

pub fn failing_task(id: &str) -> Task {
    Task::new(
        id,
        FnExecutor::arc(|_ctx| async { anyhow::bail!("intentional failure") }),
    )
}

pub fn sleeping_task(id: &str, hold: Duration) -> Task {
    Task::new(
        id,
        FnExecutor::arc(move |_ctx| async move {
            tokio::time::sleep(hold).await;
            Ok(Value::Null)
        }),
    )
}

/// Task that appends its id to a shared log when its executor runs.
pub fn recording_task(id: &str, log: &Arc<Mutex<Vec<String>>>) -> Task {
    let log = Arc::clone(log);
    Task::new(
        id,
        FnExecutor::arc(move |ctx| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(ctx.task_id.clone());
                Ok(Value::Null)
            }
        }),
    )
}

/// Task that fails until it has been attempted `failures` times.
pub fn flaky_task(id: &str, failures: u32) -> Task {
    let attempts = Arc::new(AtomicU32::new(0));
    Task::new(
        id,
        FnExecutor::arc(move |_ctx| {
            let attempts = Arc::clone(&attempts);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < failures {
                    anyhow::bail!("transient failure");
                }
                Ok(Value::Null)
            }
        }),
    )
}

/// Observes how many executors run at once and the maximum ever observed.
pub struct ConcurrencyProbe {
    current: AtomicU32,
    peak: AtomicU32,
}

impl ConcurrencyProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: AtomicU32::new(0),
            peak: AtomicU32::new(0),
        })
    }

    pub fn peak(&self) -> u32 {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn task(self: &Arc<Self>, id: &str, hold: Duration) -> Task {
        let probe = Arc::clone(self);
        Task::new(
            id,
            FnExecutor::arc(move |_ctx| {
                let probe = Arc::clone(&probe);
                async move {
                    let now = probe.current.fetch_add(1, Ordering::SeqCst) + 1;
                    probe.peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(hold).await;
                    probe.current.fetch_sub(1, Ordering::SeqCst);
                    Ok(Value::Null)
                }
            }),
        )
    }
}
