//! # shellward
//!
//! A workspace-confined shell execution tool for autonomous agents. Commands
//! pass a textual guard (deny rules, an optional allowlist, workspace
//! containment of referenced paths) and then run in their own process group
//! under a wall-clock deadline. Every outcome, including rejections and
//! timeouts, comes back as text the agent can read.
//!
//! ## Layout
//!
//! - `shellward-commons`: path resolution and containment checks.
//! - `shellward-config`: the `shellward.toml` model and [`ConfigManager`].
//! - `shellward-bash-runner`: [`SandboxConfig`], the command guard and the
//!   bounded executor.
//! - this crate: the [`ExecTool`] boundary, startup wiring and the CLI.
//!
//! ```toml
//! [exec]
//! timeout_secs = 60
//! restrict_to_workspace = true
//! allow_patterns = ["^git ", "^cargo "]
//! ```
//!
//! [`ConfigManager`]: shellward_config::ConfigManager
//! [`SandboxConfig`]: shellward_bash_runner::SandboxConfig

pub mod cli;
pub mod startup;
pub mod tools;

pub use startup::StartupContext;
pub use tools::{ExecArgs, ExecTool, Tool, ToolError};
