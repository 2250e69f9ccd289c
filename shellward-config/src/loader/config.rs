use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::ExecConfig;
use crate::debug::DebugConfig;

/// Main configuration structure for shellward
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ShellwardConfig {
    /// Shell execution sandbox settings
    #[serde(default)]
    pub exec: ExecConfig,

    /// Debug and tracing settings
    #[serde(default)]
    pub debug: DebugConfig,
}

impl ShellwardConfig {
    pub fn validate(&self) -> Result<()> {
        self.exec
            .validate()
            .context("Invalid exec configuration")?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse shellward configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}
