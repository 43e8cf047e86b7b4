//! Session orchestration facade
//!
//! The surface the session layer calls into: enable/disable per-session
//! orchestration, chunk oversized context, build tool plans, and execute
//! them. One `SessionState` per enabled session; disabling a session drops
//! its state and every chunk it owns.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::RwLock;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::info;

use crate::config::EngineConfig;
use crate::context::{analyze_file_content, ChunkingEngine, ContentType, ContextChunk, FileAnalysis};
use crate::models::ModelCatalog;
use crate::orchestration::{analyze_task, schedule, ConcurrentExecutor, OrchestrationEvent, ToolInvocationPlan};
use crate::mcp::{ProcessManager, ToolRegistry};

/// Session capabilities that can be enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    UltraLargeContext,
    MassiveToolInvocation,
    LargeFileProcessing,
    CrossModuleAnalysis,
    ComplexOrchestration,
}

/// Snapshot of one session's orchestration state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub enabled: bool,
    pub capabilities: Vec<Capability>,
    pub context_tokens_used: usize,
    pub tool_invocations_count: usize,
    pub files_processed: usize,
    pub status: String,
    pub enabled_at: DateTime<Utc>,
}

/// Returned by `enable`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub capabilities: Vec<Capability>,
    pub selected_model: String,
    pub enabled_at: DateTime<Utc>,
}

/// Returned by `process_file`.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub lines_processed: usize,
    pub content_length: usize,
    pub analysis: FileAnalysis,
    pub chunk_count: usize,
}

struct SessionState {
    capabilities: Vec<Capability>,
    enabled_at: DateTime<Utc>,
    context_tokens_used: usize,
    tool_invocations_count: usize,
    files_processed: usize,
    status: String,
    chunks: Vec<ContextChunk>,
    plan: Vec<ToolInvocationPlan>,
}

/// Facade over the registry, process manager, chunker, and model catalogue.
pub struct SessionOrchestrator {
    config: EngineConfig,
    manager: Arc<ProcessManager>,
    executor: ConcurrentExecutor,
    chunker: ChunkingEngine,
    catalog: ModelCatalog,
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl SessionOrchestrator {
    pub fn new(config: EngineConfig, registry: Arc<ToolRegistry>) -> Self {
        let manager = Arc::new(ProcessManager::new(registry));
        let executor = ConcurrentExecutor::new(Arc::clone(&manager));
        let chunker = ChunkingEngine::new(config.context_chunk_size);
        Self {
            config,
            manager,
            executor,
            chunker,
            catalog: ModelCatalog::builtin(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn manager(&self) -> &Arc<ProcessManager> {
        &self.manager
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Enable orchestration for a session with the given capabilities.
    pub async fn enable(&self, session_id: &str, capabilities: Vec<Capability>) -> SessionInfo {
        let enabled_at = Utc::now();
        info!(session = %session_id, ?capabilities, "Enabling session orchestration");

        self.sessions.write().await.insert(
            session_id.to_string(),
            SessionState {
                capabilities: capabilities.clone(),
                enabled_at,
                context_tokens_used: 0,
                tool_invocations_count: 0,
                files_processed: 0,
                status: "active".to_string(),
                chunks: Vec::new(),
                plan: Vec::new(),
            },
        );

        let selected_model = self.model_for(&capabilities).to_string();

        SessionInfo {
            session_id: session_id.to_string(),
            capabilities,
            selected_model,
            enabled_at,
        }
    }

    /// Model choice for a capability set, mirroring selection priorities:
    /// context size first, then invocation volume, then cost.
    fn model_for(&self, capabilities: &[Capability]) -> &str {
        if capabilities.contains(&Capability::UltraLargeContext) {
            "gpt-4o-max"
        } else if capabilities.contains(&Capability::MassiveToolInvocation) {
            "claude-3-5-sonnet-max"
        } else {
            "gpt-4o-mini-max"
        }
    }

    /// Disable a session, dropping its state and owned chunks. Returns
    /// whether the session existed.
    pub async fn disable(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id);
        if let Some(state) = &removed {
            info!(
                session = %session_id,
                dropped_chunks = state.chunks.len(),
                "Disabled session orchestration"
            );
        }
        removed.is_some()
    }

    pub async fn status(&self, session_id: &str) -> Option<SessionStatus> {
        self.sessions.read().await.get(session_id).map(|state| SessionStatus {
            enabled: true,
            capabilities: state.capabilities.clone(),
            context_tokens_used: state.context_tokens_used,
            tool_invocations_count: state.tool_invocations_count,
            files_processed: state.files_processed,
            status: state.status.clone(),
            enabled_at: state.enabled_at,
        })
    }

    /// Chunk oversized context for a session and account for its tokens.
    pub async fn process_context(
        &self,
        session_id: &str,
        content: &str,
        content_type: ContentType,
    ) -> Vec<ContextChunk> {
        let chunks = self.chunker.split(session_id, content, content_type);

        if let Some(state) = self.sessions.write().await.get_mut(session_id) {
            state.context_tokens_used += chunks.iter().map(|c| c.token_count).sum::<usize>();
            state.chunks.extend(chunks.iter().cloned());
        }

        chunks
    }

    /// Derive and schedule a tool plan for a task, bounded by the
    /// configured invocation limit. The plan is stored on the session for
    /// a later `execute_plan`.
    pub async fn create_plan(
        &self,
        session_id: &str,
        task_description: &str,
    ) -> Vec<ToolInvocationPlan> {
        let mut candidates = analyze_task(task_description, self.manager.registry());
        candidates.truncate(self.config.max_tool_invocations);

        let plan = schedule(candidates);

        if let Some(state) = self.sessions.write().await.get_mut(session_id) {
            state.plan = plan.clone();
        }

        info!(session = %session_id, steps = plan.len(), "Created orchestration plan");
        plan
    }

    /// Execute the session's stored plan, streaming progress events. An
    /// empty plan still terminates with a zero-total summary.
    pub async fn execute_plan(
        &self,
        session_id: &str,
    ) -> UnboundedReceiverStream<OrchestrationEvent> {
        let plan = {
            let mut sessions = self.sessions.write().await;
            match sessions.get_mut(session_id) {
                Some(state) => {
                    let plan = std::mem::take(&mut state.plan);
                    state.tool_invocations_count += plan.len();
                    plan
                }
                None => Vec::new(),
            }
        };

        let rx = self.executor.execute(plan, self.config.max_concurrent_tools);
        UnboundedReceiverStream::new(rx)
    }

    /// Ingest a file: read up to the configured line cap, classify the
    /// content, and chunk it under a derived file session id.
    pub async fn process_file(&self, path: &Path) -> Result<FileReport> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {:?}", path))?;

        let mut lines = tokio::io::BufReader::new(file).lines();
        let mut content = String::new();
        let mut line_count = 0;

        while line_count < self.config.max_file_lines {
            match lines.next_line().await? {
                Some(line) => {
                    content.push_str(&line);
                    content.push('\n');
                    line_count += 1;
                }
                None => break,
            }
        }

        let analysis = analyze_file_content(&content, path);
        let file_session = format!("file_{}", short_hash(&path.to_string_lossy()));
        let chunks = self
            .process_context(&file_session, &content, analysis.content_type)
            .await;

        info!(path = %path.display(), lines = line_count, chunks = chunks.len(), "Processed file");

        Ok(FileReport {
            path: path.display().to_string(),
            lines_processed: line_count,
            content_length: content.len(),
            analysis,
            chunk_count: chunks.len(),
        })
    }

    /// Best-effort shutdown of every tool server process.
    pub async fn cleanup(&self) {
        self.manager.cleanup_all().await;
    }
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::estimate_tokens;
    use crate::mcp::registry::{ServerDescriptor, ToolCategory, ToolDescriptor};
    use tokio_stream::StreamExt;

    fn orchestrator() -> SessionOrchestrator {
        SessionOrchestrator::new(EngineConfig::default(), Arc::new(ToolRegistry::builtin()))
    }

    #[tokio::test]
    async fn enable_status_disable_lifecycle() {
        let orch = orchestrator();

        let info = orch
            .enable("s1", vec![Capability::UltraLargeContext])
            .await;
        assert_eq!(info.selected_model, "gpt-4o-max");

        let status = orch.status("s1").await.unwrap();
        assert!(status.enabled);
        assert_eq!(status.context_tokens_used, 0);

        assert!(orch.disable("s1").await);
        assert!(orch.status("s1").await.is_none());
        assert!(!orch.disable("s1").await);
    }

    #[tokio::test]
    async fn capability_sets_pick_distinct_models() {
        let orch = orchestrator();

        let massive = orch
            .enable("s1", vec![Capability::MassiveToolInvocation])
            .await;
        assert_eq!(massive.selected_model, "claude-3-5-sonnet-max");

        let modest = orch.enable("s2", vec![Capability::LargeFileProcessing]).await;
        assert_eq!(modest.selected_model, "gpt-4o-mini-max");
    }

    #[tokio::test]
    async fn process_context_accounts_tokens_to_session() {
        let orch = orchestrator();
        orch.enable("s1", vec![Capability::UltraLargeContext]).await;

        let content = "fn main() {}\n".repeat(100);
        let chunks = orch.process_context("s1", &content, ContentType::Code).await;
        assert!(!chunks.is_empty());

        let status = orch.status("s1").await.unwrap();
        let expected: usize = chunks.iter().map(|c| c.token_count).sum();
        assert_eq!(status.context_tokens_used, expected);
        assert!(expected.abs_diff(estimate_tokens(&content)) <= chunks.len());
    }

    #[tokio::test]
    async fn create_plan_orders_candidates_by_priority() {
        let orch = orchestrator();
        orch.enable("s1", vec![Capability::ComplexOrchestration]).await;

        let plan = orch
            .create_plan("s1", "navigate the browser and fetch the api content")
            .await;
        assert!(!plan.is_empty());

        // No dependencies among candidates, so pure priority order.
        for pair in plan.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
        }
    }

    #[tokio::test]
    async fn execute_plan_runs_stored_plan() {
        let mut registry = ToolRegistry::new();
        registry.register_server(
            ServerDescriptor {
                name: "fetch".to_string(),
                command: "sh".to_string(),
                args: vec![
                    "-c".to_string(),
                    r#"while read line; do echo "{\"result\":\"ok\"}"; done"#.to_string(),
                ],
                env: HashMap::new(),
                description: "test server".to_string(),
                tools: vec!["fetch".to_string()],
            },
            vec![ToolDescriptor {
                name: "fetch".to_string(),
                server: "fetch".to_string(),
                description: "fetch".to_string(),
                parameters: HashMap::new(),
                category: ToolCategory::Web,
            }],
        );

        let orch = SessionOrchestrator::new(EngineConfig::default(), Arc::new(registry));
        orch.enable("s1", vec![Capability::MassiveToolInvocation]).await;

        let plan = orch.create_plan("s1", "fetch the api data").await;
        assert_eq!(plan.len(), 1);

        let events: Vec<OrchestrationEvent> = orch.execute_plan("s1").await.collect().await;
        assert!(matches!(
            events.last(),
            Some(OrchestrationEvent::OrchestrationCompleted {
                total: 1,
                completed: 1,
                ..
            })
        ));

        let status = orch.status("s1").await.unwrap();
        assert_eq!(status.tool_invocations_count, 1);

        orch.cleanup().await;
    }

    #[tokio::test]
    async fn execute_plan_without_session_reports_empty_summary() {
        let orch = orchestrator();
        let events: Vec<OrchestrationEvent> = orch.execute_plan("ghost").await.collect().await;
        assert!(matches!(
            events.last(),
            Some(OrchestrationEvent::OrchestrationCompleted { total: 0, .. })
        ));
    }

    #[tokio::test]
    async fn process_file_caps_lines_and_classifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.py");
        let body = "import os\n".repeat(1000);
        tokio::fs::write(&path, &body).await.unwrap();

        let orch = orchestrator();
        let report = orch.process_file(&path).await.unwrap();

        assert_eq!(report.lines_processed, orch.config().max_file_lines);
        assert_eq!(report.analysis.content_type, ContentType::Code);
        assert!(report.analysis.has_imports);
        assert!(report.chunk_count >= 1);
    }
}
