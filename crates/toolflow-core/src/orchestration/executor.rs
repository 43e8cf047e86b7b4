//! Concurrent plan executor
//!
//! Runs a scheduled plan against the process manager with a bounded number
//! of in-flight invocations, streaming progress events. Failures are
//! isolated to the failing step; the run always ends with one
//! `orchestration_completed` summary.

use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tracing::{error, info};

use super::events::OrchestrationEvent;
use super::plan::ToolInvocationPlan;
use crate::error::ManagerError;
use crate::mcp::{ProcessId, ProcessManager};

/// Default bound on simultaneously in-flight invocations.
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Executes scheduled plans against the process manager.
pub struct ConcurrentExecutor {
    manager: Arc<ProcessManager>,
}

impl ConcurrentExecutor {
    pub fn new(manager: Arc<ProcessManager>) -> Self {
        Self { manager }
    }

    /// Run the plan list, returning the progress event stream.
    ///
    /// Plans are admitted into the concurrency pool in list order (the
    /// scheduler's output order), but completion order is unconstrained.
    /// Tool server processes started for the run stay alive afterwards;
    /// callers own their lifecycle through the manager.
    pub fn execute(
        &self,
        plans: Vec<ToolInvocationPlan>,
        max_concurrent: usize,
    ) -> mpsc::UnboundedReceiver<OrchestrationEvent> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let manager = Arc::clone(&self.manager);

        tokio::spawn(async move {
            run(manager, plans, max_concurrent.max(1), event_tx).await;
        });

        event_rx
    }
}

struct RunState {
    manager: Arc<ProcessManager>,
    /// One process per owning server, started lazily for the run.
    processes: Mutex<HashMap<String, ProcessId>>,
    semaphore: Semaphore,
    started: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    total: usize,
    event_tx: mpsc::UnboundedSender<OrchestrationEvent>,
}

async fn run(
    manager: Arc<ProcessManager>,
    plans: Vec<ToolInvocationPlan>,
    max_concurrent: usize,
    event_tx: mpsc::UnboundedSender<OrchestrationEvent>,
) {
    let total = plans.len();
    info!(total, max_concurrent, "Executing orchestration plan");

    let state = Arc::new(RunState {
        manager,
        processes: Mutex::new(HashMap::new()),
        semaphore: Semaphore::new(max_concurrent),
        started: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
        failed: AtomicUsize::new(0),
        total,
        event_tx: event_tx.clone(),
    });

    let tasks: Vec<_> = plans
        .into_iter()
        .map(|plan| {
            let state = Arc::clone(&state);
            tokio::spawn(async move { run_step(state, plan).await })
        })
        .collect();

    join_all(tasks).await;

    let completed = state.completed.load(Ordering::SeqCst);
    let failed = state.failed.load(Ordering::SeqCst);
    let success_rate = if total > 0 {
        completed as f64 / total as f64
    } else {
        0.0
    };

    info!(total, completed, failed, success_rate, "Orchestration run finished");
    let _ = event_tx.send(OrchestrationEvent::OrchestrationCompleted {
        total,
        completed,
        failed,
        success_rate,
    });
}

async fn run_step(state: Arc<RunState>, plan: ToolInvocationPlan) {
    // Semaphore is never closed while steps run.
    let _permit = state.semaphore.acquire().await.expect("semaphore closed");

    let admitted = state.started.fetch_add(1, Ordering::SeqCst) + 1;
    let _ = state.event_tx.send(OrchestrationEvent::ToolStarted {
        tool_name: plan.tool_name.clone(),
        parameters: plan.parameters.clone(),
        progress: format!("{}/{}", admitted, state.total),
    });

    match invoke_plan(&state, &plan).await {
        Ok(result) => {
            state.completed.fetch_add(1, Ordering::SeqCst);
            let done = state.completed.load(Ordering::SeqCst) + state.failed.load(Ordering::SeqCst);
            let _ = state.event_tx.send(OrchestrationEvent::ToolCompleted {
                tool_name: plan.tool_name.clone(),
                result,
                progress: format!("{}/{}", done, state.total),
            });
        }
        Err(e) => {
            state.failed.fetch_add(1, Ordering::SeqCst);
            let done = state.completed.load(Ordering::SeqCst) + state.failed.load(Ordering::SeqCst);
            error!(tool = %plan.tool_name, error = %e, "Tool execution failed");
            let _ = state.event_tx.send(OrchestrationEvent::ToolFailed {
                tool_name: plan.tool_name.clone(),
                error: e.to_string(),
                progress: format!("{}/{}", done, state.total),
            });
        }
    }
}

/// Resolve the plan's owning server to a live process and invoke the tool.
async fn invoke_plan(state: &RunState, plan: &ToolInvocationPlan) -> Result<Value, ManagerError> {
    let server = state
        .manager
        .registry()
        .tool(&plan.tool_name)
        .map(|t| t.server.clone())
        .ok_or_else(|| ManagerError::UnknownTool(plan.tool_name.clone()))?;

    let process_id = {
        let mut processes = state.processes.lock().await;
        match processes.get(&server) {
            Some(id) => id.clone(),
            None => {
                let id = state.manager.start(&server).await?;
                processes.insert(server, id.clone());
                id
            }
        }
    };

    state
        .manager
        .invoke(&process_id, &plan.tool_name, plan.parameters.clone())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::registry::{ServerDescriptor, ToolCategory, ToolDescriptor, ToolRegistry};

    fn test_manager() -> Arc<ProcessManager> {
        let mut registry = ToolRegistry::new();
        registry.register_server(
            ServerDescriptor {
                name: "echo".to_string(),
                command: "sh".to_string(),
                args: vec![
                    "-c".to_string(),
                    r#"while read line; do echo "{\"result\":\"done\"}"; done"#.to_string(),
                ],
                env: HashMap::new(),
                description: "test echo server".to_string(),
                tools: vec!["echo_a".to_string(), "echo_b".to_string()],
            },
            vec![
                ToolDescriptor {
                    name: "echo_a".to_string(),
                    server: "echo".to_string(),
                    description: "echo".to_string(),
                    parameters: HashMap::new(),
                    category: ToolCategory::Other,
                },
                ToolDescriptor {
                    name: "echo_b".to_string(),
                    server: "echo".to_string(),
                    description: "echo".to_string(),
                    parameters: HashMap::new(),
                    category: ToolCategory::Other,
                },
            ],
        );
        Arc::new(ProcessManager::new(Arc::new(registry)))
    }

    async fn collect(
        mut rx: mpsc::UnboundedReceiver<OrchestrationEvent>,
    ) -> Vec<OrchestrationEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn partial_failure_yields_summary_and_isolates_steps() {
        let manager = test_manager();
        let executor = ConcurrentExecutor::new(Arc::clone(&manager));

        let plans = vec![
            ToolInvocationPlan::new("echo_a", 5),
            ToolInvocationPlan::new("echo_b", 5),
            ToolInvocationPlan::new("unregistered_tool", 5),
        ];

        let events = collect(executor.execute(plans, 2)).await;

        let completed: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, OrchestrationEvent::ToolCompleted { .. }))
            .collect();
        let failed: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, OrchestrationEvent::ToolFailed { .. }))
            .collect();
        assert_eq!(completed.len(), 2);
        assert_eq!(failed.len(), 1);

        match events.last().unwrap() {
            OrchestrationEvent::OrchestrationCompleted {
                total,
                completed,
                failed,
                success_rate,
            } => {
                assert_eq!(*total, 3);
                assert_eq!(*completed, 2);
                assert_eq!(*failed, 1);
                assert!((success_rate - 2.0 / 3.0).abs() < 1e-4);
            }
            other => panic!("expected summary, got {:?}", other),
        }

        manager.cleanup_all().await;
    }

    #[tokio::test]
    async fn per_step_events_are_ordered() {
        let manager = test_manager();
        let executor = ConcurrentExecutor::new(Arc::clone(&manager));

        let plans = vec![
            ToolInvocationPlan::new("echo_a", 5),
            ToolInvocationPlan::new("echo_b", 3),
        ];
        let events = collect(executor.execute(plans, 10)).await;

        for name in ["echo_a", "echo_b"] {
            let started = events.iter().position(|e| {
                matches!(e, OrchestrationEvent::ToolStarted { tool_name, .. } if tool_name == name)
            });
            let finished = events.iter().position(|e| {
                matches!(e, OrchestrationEvent::ToolCompleted { tool_name, .. } if tool_name == name)
            });
            assert!(started.unwrap() < finished.unwrap());
        }

        manager.cleanup_all().await;
    }

    #[tokio::test]
    async fn empty_plan_reports_zero_success_rate() {
        let manager = test_manager();
        let executor = ConcurrentExecutor::new(Arc::clone(&manager));

        let events = collect(executor.execute(Vec::new(), 5)).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            OrchestrationEvent::OrchestrationCompleted {
                total,
                success_rate,
                ..
            } => {
                assert_eq!(*total, 0);
                assert_eq!(*success_rate, 0.0);
            }
            other => panic!("expected summary, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn shared_server_process_is_reused() {
        let manager = test_manager();
        let executor = ConcurrentExecutor::new(Arc::clone(&manager));

        let plans = vec![
            ToolInvocationPlan::new("echo_a", 5),
            ToolInvocationPlan::new("echo_b", 5),
        ];
        collect(executor.execute(plans, 4)).await;

        // Both tools live on the same server, so one process serves both.
        assert_eq!(manager.list_status().await.len(), 1);
        manager.cleanup_all().await;
    }
}
