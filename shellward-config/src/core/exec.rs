use std::time::Duration;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::{defaults, env};

/// Shell execution sandbox configuration (`[exec]`).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExecConfig {
    /// Directory commands are confined to. Relative values are resolved
    /// against the workspace the config was loaded for; absent or empty means
    /// the workspace itself.
    #[serde(default)]
    pub workspace_root: Option<String>,

    /// Wall-clock limit for a single command, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Reject commands that reference paths outside the workspace root.
    #[serde(default = "default_restrict_to_workspace")]
    pub restrict_to_workspace: bool,

    /// Regex allow patterns. When non-empty a command must match one of them.
    #[serde(default)]
    pub allow_patterns: Vec<String>,

    /// Extra regex deny patterns, appended to the built-in blocklist.
    #[serde(default)]
    pub deny_patterns: Vec<String>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            workspace_root: None,
            timeout_secs: default_timeout_secs(),
            restrict_to_workspace: default_restrict_to_workspace(),
            allow_patterns: Vec::new(),
            deny_patterns: Vec::new(),
        }
    }
}

impl ExecConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured root, ignoring blank values.
    pub fn workspace_root(&self) -> Option<&str> {
        self.workspace_root
            .as_deref()
            .map(str::trim)
            .filter(|root| !root.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.timeout_secs > 0, "exec.timeout_secs must be greater than zero");
        Ok(())
    }

    /// Merge comma-separated pattern lists from the environment into the
    /// configured lists. `lookup` is usually `std::env::var(..).ok()`.
    pub fn merge_env_patterns(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.allow_patterns = merge_patterns(&self.allow_patterns, lookup(env::ALLOW_PATTERNS));
        self.deny_patterns = merge_patterns(&self.deny_patterns, lookup(env::DENY_PATTERNS));
    }
}

fn merge_patterns(base: &[String], extra: Option<String>) -> Vec<String> {
    let mut combined: Vec<String> = base.iter().map(|entry| entry.trim().to_string()).collect();
    if let Some(extra) = extra {
        combined.extend(
            extra
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty()),
        );
    }
    combined.retain(|item| !item.is_empty());
    combined
}

#[inline]
const fn default_timeout_secs() -> u64 {
    defaults::DEFAULT_TIMEOUT_SECS
}

#[inline]
const fn default_restrict_to_workspace() -> bool {
    defaults::DEFAULT_RESTRICT_TO_WORKSPACE
}
