//! Guarded shell execution for agent tools.
//!
//! A [`SandboxConfig`] fixes the workspace boundary, timeout and pattern
//! rules. [`CommandGuard`] decides whether a command may run, and
//! [`BoundedExecutor`] runs the survivors through a [`CommandExecutor`] in
//! their own process group, folding every outcome into the text returned to
//! the agent.

pub mod config;
pub mod executor;
pub mod patterns;
pub mod policy;
pub mod process_group;
pub mod runner;

#[cfg(test)]
mod test_support;

pub use config::{DEFAULT_TIMEOUT, PatternRule, PatternSet, SandboxConfig};
pub use executor::{
    CommandExecutor, CommandInvocation, MAX_CAPTURE_BYTES, ProcessCommandExecutor, ProcessOutcome,
    ShellKind,
};
pub use patterns::DEFAULT_DENY_PATTERNS;
pub use policy::{BlockReason, CommandGuard, GuardDecision};
pub use runner::{
    BoundedExecutor, CommandRequest, ExecStatus, ExecutionResult, MAX_OUTPUT_CHARS,
    render_output, truncate_output,
};
