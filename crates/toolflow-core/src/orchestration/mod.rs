//! Orchestration planning and execution.

pub mod events;
pub mod executor;
pub mod plan;

pub use events::OrchestrationEvent;
pub use executor::{ConcurrentExecutor, DEFAULT_MAX_CONCURRENT};
pub use plan::{analyze_task, schedule, ToolInvocationPlan};
