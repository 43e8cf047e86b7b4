//! Process manager for tool server lifecycles
//!
//! Owns the live-process table. Starts, monitors, invokes, and stops the
//! external tool server processes registered in the [`ToolRegistry`].
//!
//! Each process handle owns one stdio channel. The manager serializes
//! invocations per process (one in-flight request at a time) while allowing
//! different processes to be invoked concurrently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::protocol::{annotate_response, ToolCallRequest};
use super::registry::ToolRegistry;
use super::transport::StdioTransport;
use crate::error::ManagerError;

pub type ProcessId = String;

const INVOKE_TIMEOUT_SECS: u64 = 30;
const GRACEFUL_STOP_WAIT: Duration = Duration::from_secs(5);
const FORCED_STOP_WAIT: Duration = Duration::from_secs(2);

/// Live status of a managed process.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessStatus {
    NotFound,
    Running {
        server_name: String,
        started_at: DateTime<Utc>,
        uptime_secs: u64,
    },
    Stopped {
        server_name: String,
        exit_code: Option<i32>,
    },
}

/// How a stop resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Graceful,
    Forced,
}

/// A live tool server process with its exclusive stdio channel.
pub struct ProcessHandle {
    pub id: ProcessId,
    pub server_name: String,
    started: Instant,
    started_at: DateTime<Utc>,
    transport: StdioTransport,
    /// Serializes invocations: one in-flight request per process.
    invoke_lock: Mutex<()>,
}

impl ProcessHandle {
    /// Graceful-then-forced shutdown. The handle must already be removed
    /// from the live table by the caller.
    async fn shutdown(&self) -> StopOutcome {
        self.transport.terminate().await;
        if self.transport.wait_with_timeout(GRACEFUL_STOP_WAIT).await.is_some() {
            info!(process_id = %self.id, "Tool server stopped gracefully");
            return StopOutcome::Graceful;
        }

        self.transport.force_kill().await;
        if self.transport.wait_with_timeout(FORCED_STOP_WAIT).await.is_none() {
            warn!(process_id = %self.id, "Tool server did not exit after force kill");
        } else {
            warn!(process_id = %self.id, "Tool server force killed");
        }
        StopOutcome::Forced
    }
}

/// Manager for external tool server processes.
pub struct ProcessManager {
    registry: Arc<ToolRegistry>,
    processes: RwLock<HashMap<ProcessId, Arc<ProcessHandle>>>,
}

impl ProcessManager {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            processes: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Start a registered server, returning the new process id.
    pub async fn start(&self, server_name: &str) -> Result<ProcessId, ManagerError> {
        let server = self
            .registry
            .server(server_name)
            .ok_or_else(|| ManagerError::UnknownServer(server_name.to_string()))?;

        let transport = StdioTransport::spawn(&server.command, &server.args, &server.env)
            .await
            .map_err(|source| ManagerError::LaunchFailure {
                server: server_name.to_string(),
                source,
            })?;

        let started_at = Utc::now();
        let id = format!(
            "{}_{}_{}",
            server_name,
            transport.pid().unwrap_or(0),
            started_at.format("%Y%m%d_%H%M%S%3f")
        );

        let handle = Arc::new(ProcessHandle {
            id: id.clone(),
            server_name: server_name.to_string(),
            started: Instant::now(),
            started_at,
            transport,
            invoke_lock: Mutex::new(()),
        });

        self.processes.write().await.insert(id.clone(), handle);
        info!(server = %server_name, process_id = %id, "Started tool server");
        Ok(id)
    }

    /// Non-blocking status poll for one process.
    pub async fn status(&self, process_id: &str) -> ProcessStatus {
        let handle = match self.processes.read().await.get(process_id) {
            Some(handle) => Arc::clone(handle),
            None => return ProcessStatus::NotFound,
        };

        match handle.transport.poll_exit().await {
            Some(exit_code) => ProcessStatus::Stopped {
                server_name: handle.server_name.clone(),
                exit_code,
            },
            None => ProcessStatus::Running {
                server_name: handle.server_name.clone(),
                started_at: handle.started_at,
                uptime_secs: handle.started.elapsed().as_secs(),
            },
        }
    }

    /// Status of every live handle.
    pub async fn list_status(&self) -> HashMap<ProcessId, ProcessStatus> {
        let ids: Vec<ProcessId> = self.processes.read().await.keys().cloned().collect();
        let mut statuses = HashMap::new();
        for id in ids {
            let status = self.status(&id).await;
            statuses.insert(id, status);
        }
        statuses
    }

    /// Invoke a tool on a running process.
    ///
    /// Validates process liveness and tool ownership, then performs one
    /// framed request/response exchange on the process's private channel.
    /// The per-handle invocation lock guarantees a second caller observes
    /// the first caller's full response before its own request is sent.
    pub async fn invoke(
        &self,
        process_id: &str,
        tool_name: &str,
        parameters: Value,
    ) -> Result<Value, ManagerError> {
        let handle = self
            .processes
            .read()
            .await
            .get(process_id)
            .cloned()
            .ok_or_else(|| ManagerError::ProcessNotFound(process_id.to_string()))?;

        if handle.transport.poll_exit().await.is_some() {
            return Err(ManagerError::ProcessStopped(process_id.to_string()));
        }

        let tool = self
            .registry
            .tool(tool_name)
            .ok_or_else(|| ManagerError::UnknownTool(tool_name.to_string()))?;

        if tool.server != handle.server_name {
            return Err(ManagerError::ToolServerMismatch {
                tool: tool_name.to_string(),
                server: handle.server_name.clone(),
            });
        }

        let _guard = handle.invoke_lock.lock().await;

        let request = ToolCallRequest::new(tool_name, parameters);
        let frame = serde_json::to_string(&request)
            .map_err(|e| ManagerError::ProtocolError(e.to_string()))?;

        if let Err(e) = handle.transport.send(&frame).await {
            return Err(self.classify_channel_error(&handle, e).await);
        }

        let line = match tokio::time::timeout(
            Duration::from_secs(INVOKE_TIMEOUT_SECS),
            handle.transport.receive(),
        )
        .await
        {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => return Err(self.classify_channel_error(&handle, e).await),
            Err(_) => return Err(ManagerError::InvocationTimeout(INVOKE_TIMEOUT_SECS)),
        };

        let response: Value = serde_json::from_str(&line)
            .map_err(|e| ManagerError::ProtocolError(e.to_string()))?;
        if !response.is_object() {
            return Err(ManagerError::ProtocolError(format!(
                "expected JSON object, got: {}",
                line
            )));
        }

        info!(tool = %tool_name, process_id = %process_id, "Tool invocation succeeded");
        Ok(annotate_response(response, tool_name, process_id))
    }

    /// Stop a process (graceful, then forced). The handle is removed from
    /// the live table regardless of which path was taken.
    pub async fn stop(&self, process_id: &str) -> Result<StopOutcome, ManagerError> {
        let handle = self
            .processes
            .write()
            .await
            .remove(process_id)
            .ok_or_else(|| ManagerError::ProcessNotFound(process_id.to_string()))?;

        Ok(handle.shutdown().await)
    }

    /// Stop the process and start a fresh one for the same server. The old
    /// process id is invalidated.
    pub async fn restart(&self, process_id: &str) -> Result<ProcessId, ManagerError> {
        let server_name = self
            .processes
            .read()
            .await
            .get(process_id)
            .map(|h| h.server_name.clone())
            .ok_or_else(|| ManagerError::ProcessNotFound(process_id.to_string()))?;

        self.stop(process_id).await?;
        self.start(&server_name).await
    }

    /// Best-effort shutdown of every live process. Individual failures are
    /// logged and collected; this operation itself never fails.
    pub async fn cleanup_all(&self) -> Vec<(ProcessId, StopOutcome)> {
        let handles: Vec<Arc<ProcessHandle>> =
            self.processes.write().await.drain().map(|(_, h)| h).collect();

        info!(count = handles.len(), "Cleaning up tool server processes");

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            let outcome = handle.shutdown().await;
            if outcome == StopOutcome::Forced {
                warn!(process_id = %handle.id, "Cleanup had to force kill process");
            }
            outcomes.push((handle.id.clone(), outcome));
        }
        outcomes
    }

    async fn classify_channel_error(
        &self,
        handle: &ProcessHandle,
        error: anyhow::Error,
    ) -> ManagerError {
        if !handle.transport.is_alive().await {
            ManagerError::ProcessStopped(handle.id.clone())
        } else {
            ManagerError::ProtocolError(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::registry::{ServerDescriptor, ToolCategory, ToolDescriptor, ToolRegistry};
    use serde_json::json;

    /// Registry with a fake "fetch" server backed by a shell one-liner that
    /// answers every request line with a fixed JSON result.
    fn test_registry(script: &str) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register_server(
            ServerDescriptor {
                name: "fetch".to_string(),
                command: "sh".to_string(),
                args: vec!["-c".to_string(), script.to_string()],
                env: HashMap::new(),
                description: "test fetch server".to_string(),
                tools: vec!["fetch_url".to_string()],
            },
            vec![ToolDescriptor {
                name: "fetch_url".to_string(),
                server: "fetch".to_string(),
                description: "fetch a url".to_string(),
                parameters: HashMap::new(),
                category: ToolCategory::Web,
            }],
        );
        registry.register_server(
            ServerDescriptor {
                name: "other".to_string(),
                command: "sh".to_string(),
                args: vec!["-c".to_string(), "while read line; do :; done".to_string()],
                env: HashMap::new(),
                description: "server without the fetch tool".to_string(),
                tools: vec!["other_tool".to_string()],
            },
            vec![ToolDescriptor {
                name: "other_tool".to_string(),
                server: "other".to_string(),
                description: "noop".to_string(),
                parameters: HashMap::new(),
                category: ToolCategory::Other,
            }],
        );
        Arc::new(registry)
    }

    const ECHO_SERVER: &str =
        r#"while read line; do echo "{\"result\":\"page content\"}"; done"#;

    #[tokio::test]
    async fn start_invoke_stop_roundtrip() {
        let manager = ProcessManager::new(test_registry(ECHO_SERVER));

        let id = manager.start("fetch").await.unwrap();
        assert!(matches!(
            manager.status(&id).await,
            ProcessStatus::Running { .. }
        ));

        let response = manager
            .invoke(&id, "fetch_url", json!({"url": "https://example.com"}))
            .await
            .unwrap();
        assert_eq!(response["result"], "page content");
        assert_eq!(response["tool_name"], "fetch_url");
        assert_eq!(response["process_id"], id.as_str());

        manager.stop(&id).await.unwrap();
        assert!(matches!(
            manager.status(&id).await,
            ProcessStatus::NotFound
        ));
    }

    #[tokio::test]
    async fn start_fails_for_unknown_server() {
        let manager = ProcessManager::new(test_registry(ECHO_SERVER));
        let err = manager.start("nope").await.unwrap_err();
        assert!(matches!(err, ManagerError::UnknownServer(_)));
    }

    #[tokio::test]
    async fn invoke_validation_ladder() {
        let manager = ProcessManager::new(test_registry(ECHO_SERVER));

        let err = manager.invoke("ghost", "fetch_url", json!({})).await.unwrap_err();
        assert!(matches!(err, ManagerError::ProcessNotFound(_)));

        let id = manager.start("fetch").await.unwrap();

        let err = manager.invoke(&id, "no_such_tool", json!({})).await.unwrap_err();
        assert!(matches!(err, ManagerError::UnknownTool(_)));

        let err = manager.invoke(&id, "other_tool", json!({})).await.unwrap_err();
        assert!(matches!(err, ManagerError::ToolServerMismatch { .. }));

        manager.stop(&id).await.unwrap();
    }

    #[tokio::test]
    async fn invoke_after_process_death_reports_stopped() {
        // Server answers one request, then exits.
        let script = r#"read line; echo "{\"result\":\"once\"}""#;
        let manager = ProcessManager::new(test_registry(script));

        let id = manager.start("fetch").await.unwrap();
        let response = manager.invoke(&id, "fetch_url", json!({})).await.unwrap();
        assert_eq!(response["result"], "once");

        // Give the process a moment to exit.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let err = manager.invoke(&id, "fetch_url", json!({})).await.unwrap_err();
        assert!(matches!(err, ManagerError::ProcessStopped(_)));
        assert!(matches!(
            manager.status(&id).await,
            ProcessStatus::Stopped { .. }
        ));

        manager.stop(&id).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_response_is_protocol_error() {
        let script = r#"while read line; do echo "{not json"; done"#;
        let manager = ProcessManager::new(test_registry(script));

        let id = manager.start("fetch").await.unwrap();
        let err = manager.invoke(&id, "fetch_url", json!({})).await.unwrap_err();
        assert!(matches!(err, ManagerError::ProtocolError(_)));

        manager.stop(&id).await.unwrap();
    }

    #[tokio::test]
    async fn double_stop_reports_not_found() {
        let manager = ProcessManager::new(test_registry(ECHO_SERVER));
        let id = manager.start("fetch").await.unwrap();

        manager.stop(&id).await.unwrap();
        let err = manager.stop(&id).await.unwrap_err();
        assert!(matches!(err, ManagerError::ProcessNotFound(_)));
    }

    #[tokio::test]
    async fn two_starts_yield_distinct_process_ids() {
        let manager = ProcessManager::new(test_registry(ECHO_SERVER));
        let a = manager.start("fetch").await.unwrap();
        let b = manager.start("fetch").await.unwrap();
        assert_ne!(a, b);
        manager.cleanup_all().await;
    }

    #[tokio::test]
    async fn restart_invalidates_old_id() {
        let manager = ProcessManager::new(test_registry(ECHO_SERVER));
        let old = manager.start("fetch").await.unwrap();

        let new = manager.restart(&old).await.unwrap();
        assert_ne!(old, new);
        assert!(matches!(manager.status(&old).await, ProcessStatus::NotFound));
        assert!(matches!(
            manager.status(&new).await,
            ProcessStatus::Running { .. }
        ));

        manager.cleanup_all().await;
    }

    #[tokio::test]
    async fn cleanup_all_empties_live_table() {
        let manager = ProcessManager::new(test_registry(ECHO_SERVER));
        manager.start("fetch").await.unwrap();
        manager.start("fetch").await.unwrap();

        let outcomes = manager.cleanup_all().await;
        assert_eq!(outcomes.len(), 2);
        assert!(manager.list_status().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_invokes_on_one_process_serialize() {
        // Server answers each request after a short delay; interleaved
        // frames would corrupt the response pairing.
        let script = r#"while read line; do sleep 0.1; echo "{\"result\":\"ok\"}"; done"#;
        let manager = Arc::new(ProcessManager::new(test_registry(script)));
        let id = manager.start("fetch").await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                manager.invoke(&id, "fetch_url", json!({})).await
            }));
        }

        for task in tasks {
            let response = task.await.unwrap().unwrap();
            assert_eq!(response["result"], "ok");
        }

        manager.stop(&id).await.unwrap();
    }
}
