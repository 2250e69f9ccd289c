use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use shellward_bash_runner::SandboxConfig;
use shellward_config::{ConfigManager, ExecConfig, ShellwardConfig};
use tracing::debug;

use crate::cli::Cli;

/// Everything the binary needs after argument parsing.
#[derive(Debug)]
pub struct StartupContext {
    pub workspace: PathBuf,
    pub config: ShellwardConfig,
    pub config_path: Option<PathBuf>,
    pub sandbox: Arc<SandboxConfig>,
}

impl StartupContext {
    pub fn from_cli_args(args: &Cli) -> Result<Self> {
        let workspace_override = args
            .workspace
            .clone()
            .map(resolve_workspace_path)
            .transpose()
            .context("Failed to resolve workspace directory")?;

        if let Some(workspace) = &workspace_override
            && !workspace.is_dir()
        {
            bail!(
                "Workspace path '{}' does not exist or is not a directory",
                workspace.display()
            );
        }

        let manager = match (&args.config, &workspace_override) {
            (Some(path), workspace) => {
                let manager = ConfigManager::load_from_file(path).with_context(|| {
                    format!("Failed to load configuration from {}", path.display())
                })?;
                match workspace {
                    Some(workspace) => manager.with_workspace_root(workspace.clone()),
                    None => manager,
                }
            }
            (None, Some(workspace)) => ConfigManager::load_from_workspace(workspace)?,
            (None, None) => ConfigManager::load()?,
        };

        Self::from_manager(&manager)
    }

    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        let sandbox_root = manager.sandbox_root();
        let config = manager.config().clone();
        let sandbox = build_sandbox_config(&sandbox_root, &config.exec)?;

        debug!(
            workspace = %manager.workspace_root().display(),
            sandbox_root = %sandbox_root.display(),
            config_path = ?manager.config_path(),
            "Startup context ready"
        );

        Ok(Self {
            workspace: manager.workspace_root().to_path_buf(),
            config_path: manager.config_path().map(Path::to_path_buf),
            config,
            sandbox: Arc::new(sandbox),
        })
    }
}

/// Compile the `[exec]` table into a [`SandboxConfig`] rooted at `root`.
pub fn build_sandbox_config(root: &Path, exec: &ExecConfig) -> Result<SandboxConfig> {
    let sandbox = SandboxConfig::new(root)
        .context("Failed to compile built-in deny patterns")?
        .with_timeout(exec.timeout())
        .with_restrict_to_workspace(exec.restrict_to_workspace)
        .with_extra_deny_patterns(&exec.deny_patterns)
        .context("Invalid exec.deny_patterns")?
        .with_allow_patterns(&exec.allow_patterns)
        .context("Invalid exec.allow_patterns")?;
    Ok(sandbox)
}

fn resolve_workspace_path(path: PathBuf) -> Result<PathBuf> {
    let mut resolved = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("Failed to determine current working directory")?
            .join(path)
    };

    if resolved.exists() {
        resolved = resolved.canonicalize().with_context(|| {
            format!(
                "Failed to canonicalize workspace path {}",
                resolved.display()
            )
        })?;
    }

    Ok(resolved)
}
