//! Configuration for the shellward execution sandbox.
//!
//! The model mirrors the on-disk `shellward.toml` layout: an `[exec]` table
//! describing the workspace boundary, timeout and pattern lists, and a
//! `[debug]` table for tracing. [`ConfigManager`] locates, parses, merges
//! environment overrides into, and validates that file.

pub mod constants;
pub mod core;
pub mod debug;
pub mod loader;

pub use crate::core::ExecConfig;
pub use debug::{DebugConfig, TraceLevel};
pub use loader::{ConfigManager, ShellwardConfig};
