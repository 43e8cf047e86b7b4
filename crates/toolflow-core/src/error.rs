//! Error taxonomy for the process manager.
//!
//! Every failure the manager can surface is a `ManagerError` variant. The
//! executor converts these into per-step `tool_failed` events, so a single
//! failing invocation never aborts its siblings.

use thiserror::Error;

/// Errors surfaced by [`crate::mcp::ProcessManager`] operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The requested server name was never registered.
    #[error("server '{0}' not registered")]
    UnknownServer(String),

    /// The OS refused to spawn the server process.
    #[error("failed to launch server '{server}'")]
    LaunchFailure {
        server: String,
        #[source]
        source: std::io::Error,
    },

    /// No live process with this id.
    #[error("process '{0}' not found")]
    ProcessNotFound(String),

    /// The process exited since the last status check.
    #[error("tool server process '{0}' has stopped")]
    ProcessStopped(String),

    /// The tool name is not in the registry.
    #[error("tool '{0}' not registered")]
    UnknownTool(String),

    /// The tool is hosted by a different server than the invoked process.
    #[error("tool '{tool}' does not belong to server '{server}'")]
    ToolServerMismatch { tool: String, server: String },

    /// No response arrived within the invocation timeout.
    #[error("tool invocation timed out after {0}s")]
    InvocationTimeout(u64),

    /// The server replied with something that is not a JSON object.
    #[error("invalid response from tool server: {0}")]
    ProtocolError(String),
}
