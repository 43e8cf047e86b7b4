//! Engine configuration
//!
//! Limits for context processing and tool orchestration. Loaded from a
//! `toolflow.toml` when present, otherwise built from defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Limits for context processing and tool orchestration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on cumulative context tokens per session.
    pub max_context_tokens: usize,
    /// Upper bound on tool invocations in a single plan.
    pub max_tool_invocations: usize,
    /// Line cap when ingesting a file.
    pub max_file_lines: usize,
    /// Simultaneously in-flight tool invocations.
    pub max_concurrent_tools: usize,
    /// Token budget per context chunk.
    pub context_chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 1_000_000,
            max_tool_invocations: 200,
            max_file_lines: 750,
            max_concurrent_tools: 10,
            context_chunk_size: 50_000,
        }
    }
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults if absent.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No engine config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;

        let config: EngineConfig =
            toml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))?;

        tracing::info!("Loaded engine config from {:?}", path);
        Ok(config)
    }
}
