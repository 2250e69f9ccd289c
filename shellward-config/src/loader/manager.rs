use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::constants::{env, files};
use crate::loader::config::ShellwardConfig;

/// Configuration manager for loading and validating configurations
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: ShellwardConfig,
    config_path: Option<PathBuf>,
    workspace_root: PathBuf,
}

impl ConfigManager {
    /// Load configuration from the default locations.
    ///
    /// `SHELLWARD_CONFIG_PATH` wins, then `SHELLWARD_WORKSPACE`, then the
    /// current directory.
    pub fn load() -> Result<Self> {
        if let Ok(config_path) = std::env::var(env::CONFIG_PATH) {
            let trimmed = config_path.trim();
            if !trimmed.is_empty() {
                return Self::load_from_file(trimmed).with_context(|| {
                    format!(
                        "Failed to load configuration from {}={trimmed}",
                        env::CONFIG_PATH
                    )
                });
            }
        }

        if let Ok(workspace_path) = std::env::var(env::WORKSPACE) {
            let trimmed = workspace_path.trim();
            if !trimmed.is_empty() {
                return Self::load_from_workspace(trimmed).with_context(|| {
                    format!(
                        "Failed to load configuration from {}={trimmed}",
                        env::WORKSPACE
                    )
                });
            }
        }

        Self::load_from_workspace(std::env::current_dir()?)
    }

    /// Load configuration from a specific workspace
    pub fn load_from_workspace(workspace: impl AsRef<Path>) -> Result<Self> {
        Self::load_from_workspace_with(workspace, |name| std::env::var(name).ok())
    }

    /// Same as [`Self::load_from_workspace`] with an explicit environment
    /// lookup for pattern overrides.
    pub fn load_from_workspace_with(
        workspace: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let workspace_root = workspace.as_ref().to_path_buf();

        let candidates = [
            workspace_root.join(files::CONFIG_FILE_NAME),
            workspace_root
                .join(files::CONFIG_DIR_NAME)
                .join(files::CONFIG_FILE_NAME),
        ];

        let (config, config_path) = match candidates.into_iter().find(|path| path.is_file()) {
            Some(path) => (ShellwardConfig::from_file(&path)?, Some(path)),
            None => {
                debug!(
                    workspace = %workspace_root.display(),
                    "No shellward.toml found; using default configuration"
                );
                (ShellwardConfig::default(), None)
            }
        };

        Self::finish(config, config_path, workspace_root, lookup)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_from_file_with(path, |name| std::env::var(name).ok())
    }

    pub fn load_from_file_with(
        path: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let config = ShellwardConfig::from_file(path)?;
        let workspace_root = workspace_for_config_file(path)?;
        Self::finish(config, Some(path.to_path_buf()), workspace_root, lookup)
    }

    fn finish(
        mut config: ShellwardConfig,
        config_path: Option<PathBuf>,
        workspace_root: PathBuf,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        config.exec.merge_env_patterns(lookup);
        config
            .validate()
            .context("Configuration failed validation")?;

        Ok(Self {
            config,
            config_path,
            workspace_root,
        })
    }

    /// Treat `workspace` as the workspace root, regardless of where the
    /// configuration file was found.
    pub fn with_workspace_root(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace_root = workspace.into();
        self
    }

    pub fn config(&self) -> &ShellwardConfig {
        &self.config
    }

    pub fn into_config(self) -> ShellwardConfig {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// The sandbox root: `exec.workspace_root` resolved against the
    /// workspace, or the workspace itself when unset.
    pub fn sandbox_root(&self) -> PathBuf {
        match self.config.exec.workspace_root() {
            Some(root) => {
                let root = Path::new(root);
                if root.is_absolute() {
                    root.to_path_buf()
                } else {
                    self.workspace_root.join(root)
                }
            }
            None => self.workspace_root.clone(),
        }
    }
}

/// `<ws>/shellward.toml` and `<ws>/.shellward/shellward.toml` both belong to
/// `<ws>`.
fn workspace_for_config_file(path: &Path) -> Result<PathBuf> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().context("Failed to determine current directory")?,
    };

    if parent.file_name().and_then(|name| name.to_str()) == Some(files::CONFIG_DIR_NAME)
        && let Some(grandparent) = parent.parent()
    {
        return Ok(grandparent.to_path_buf());
    }
    Ok(parent)
}
