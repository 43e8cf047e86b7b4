//! Tool server management: registry, wire protocol, stdio transport, and
//! the process manager that ties them together.

pub mod manager;
pub mod protocol;
pub mod registry;
pub mod transport;

pub use manager::{ProcessId, ProcessManager, ProcessStatus, StopOutcome};
pub use registry::{ServerDescriptor, ToolCategory, ToolDescriptor, ToolRegistry};
