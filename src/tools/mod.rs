//! Tools exposed to the agent.

pub mod exec;
pub mod traits;

pub use exec::{ExecArgs, ExecTool};
pub use traits::{Tool, ToolError};
