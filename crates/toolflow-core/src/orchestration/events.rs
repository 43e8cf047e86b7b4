//! Progress event protocol for orchestration runs.
//!
//! `OrchestrationEvent` is the single source of truth for everything the
//! executor emits. Transport layers (e.g. an SSE endpoint) consume these
//! events and map them to their own wire format.
//!
//! Events for the *same* plan step are strictly ordered (`tool_started`
//! before its `tool_completed`/`tool_failed`); events across different
//! steps may interleave because of concurrency.

use serde::Serialize;
use serde_json::Value;

/// Events emitted while executing a tool orchestration plan.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    /// A plan step was admitted into the concurrency pool.
    ToolStarted {
        tool_name: String,
        parameters: Value,
        progress: String,
    },

    /// A plan step finished with a result payload.
    ToolCompleted {
        tool_name: String,
        result: Value,
        progress: String,
    },

    /// A plan step failed. Sibling steps are unaffected.
    ToolFailed {
        tool_name: String,
        error: String,
        progress: String,
    },

    /// Terminal summary for the whole run.
    OrchestrationCompleted {
        total: usize,
        completed: usize,
        failed: usize,
        success_rate: f64,
    },
}
