//! Core engine for tool orchestration over external tool server processes.
//!
//! The crate is organised around four concerns:
//!
//! - [`mcp`]: the tool/server registry, the stdio wire protocol, and the
//!   process manager that launches and supervises tool servers.
//! - [`orchestration`]: task analysis into tool plans, dependency-aware
//!   scheduling, and bounded-concurrency execution with streamed events.
//! - [`context`]: token-budget chunking of oversized content and file
//!   content analysis.
//! - [`models`]: the model catalogue and deterministic selection scoring.
//!
//! [`session::SessionOrchestrator`] is the facade that ties these together
//! for per-session use.

pub mod config;
pub mod context;
pub mod error;
pub mod mcp;
pub mod models;
pub mod orchestration;
pub mod session;

pub use config::EngineConfig;
pub use error::ManagerError;
pub use mcp::{ProcessManager, ToolRegistry};
pub use orchestration::{ConcurrentExecutor, OrchestrationEvent, ToolInvocationPlan};
pub use session::SessionOrchestrator;
